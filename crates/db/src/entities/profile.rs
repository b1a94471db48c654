//! Profile entity, one per user account.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Which side of a mentorship the account is on.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Offers guidance.
    #[sea_orm(string_value = "MENTOR")]
    Mentor,
    /// Looks for guidance.
    #[default]
    #[sea_orm(string_value = "MENTEE")]
    Mentee,
}

/// Employment status shown on the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkingStatus {
    /// Works for an organization.
    #[sea_orm(string_value = "EMPLOYED")]
    Employed,
    /// Runs their own business.
    #[sea_orm(string_value = "SELF_EMPLOYED")]
    SelfEmployed,
    /// Not currently working.
    #[sea_orm(string_value = "UNEMPLOYED")]
    Unemployed,
}

impl WorkingStatus {
    /// Whether organization and designation must be filled in.
    #[must_use]
    pub const fn requires_employer(self) -> bool {
        matches!(self, Self::Employed | Self::SelfEmployed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profile")]
pub struct Model {
    /// Same as user.id (1:1 relationship)
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,

    #[sea_orm(indexed)]
    pub role: UserRole,

    /// Storage key of the avatar image
    #[sea_orm(nullable)]
    pub image_key: Option<String>,

    #[sea_orm(nullable)]
    pub display_name: Option<String>,

    /// Bio
    #[sea_orm(column_type = "Text", nullable)]
    pub info: Option<String>,

    #[sea_orm(nullable)]
    pub phone_number: Option<String>,

    #[sea_orm(nullable)]
    pub working_status: Option<WorkingStatus>,

    #[sea_orm(nullable)]
    pub organization: Option<String>,

    #[sea_orm(nullable)]
    pub designation: Option<String>,

    #[sea_orm(nullable)]
    pub linkedin_url: Option<String>,

    #[sea_orm(nullable)]
    pub github_url: Option<String>,

    /// Storage key of the uploaded resume
    #[sea_orm(nullable)]
    pub resume_key: Option<String>,

    #[sea_orm(default_value = false)]
    pub terms_accepted: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
