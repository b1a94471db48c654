//! Chat group entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Chat group - a room with members, an online set and messages.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chat_group")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Unique short name, used in URLs and to derive the meeting id.
    #[sea_orm(unique)]
    pub group_name: String,

    /// Display name (optional).
    #[sea_orm(nullable)]
    pub groupchat_name: Option<String>,

    /// Admin of the group. Cleared when the admin account is deleted.
    #[sea_orm(nullable, indexed)]
    pub admin_id: Option<String>,

    #[sea_orm(default_value = false)]
    pub is_private: bool,

    /// Assigned on first access and never changed afterwards.
    #[sea_orm(nullable)]
    pub meeting_id: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AdminId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Admin,
    #[sea_orm(has_many = "super::chat_group_member::Entity")]
    Members,
    #[sea_orm(has_many = "super::chat_group_online::Entity")]
    Online,
    #[sea_orm(has_many = "super::group_message::Entity")]
    Messages,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Admin.def()
    }
}

impl Related<super::chat_group_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::chat_group_online::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Online.def()
    }
}

impl Related<super::group_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
