//! User account entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Always stored lowercased.
    #[sea_orm(unique)]
    pub username: String,

    #[sea_orm(nullable, indexed)]
    pub email: Option<String>,

    #[sea_orm(default_value = false)]
    pub email_verified: bool,

    /// Pending email verification token
    #[sea_orm(unique, nullable)]
    #[serde(skip_serializing)]
    pub email_verification_token: Option<String>,

    /// Password hash (Argon2)
    #[serde(skip_serializing)]
    pub password: String,

    /// Bearer token
    #[sea_orm(unique)]
    #[serde(skip_serializing)]
    pub token: String,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::profile::Entity")]
    Profile,

    #[sea_orm(has_many = "super::group_message::Entity")]
    Messages,

    #[sea_orm(has_many = "super::chat_group_member::Entity")]
    Memberships,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl Related<super::group_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl Related<super::chat_group_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
