//! Chat message posted to a group.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Group message. Carries a text body, an attached file, or both.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group_message")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub group_id: String,

    #[sea_orm(indexed)]
    pub author_id: String,

    /// Text body (max 300 characters)
    #[sea_orm(nullable)]
    pub body: Option<String>,

    /// Storage key of the attached file
    #[sea_orm(nullable)]
    pub file_key: Option<String>,

    /// Original name of the attached file
    #[sea_orm(nullable)]
    pub file_name: Option<String>,

    /// Size of the attached file in bytes
    #[sea_orm(nullable)]
    pub file_size: Option<i64>,

    /// Whether the attached file decoded as an image when it was posted
    #[sea_orm(nullable)]
    pub is_image: Option<bool>,

    #[sea_orm(indexed)]
    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Whether the message carries an attachment.
    #[must_use]
    pub const fn has_file(&self) -> bool {
        self.file_key.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::chat_group::Entity",
        from = "Column::GroupId",
        to = "super::chat_group::Column::Id",
        on_delete = "Cascade"
    )]
    Group,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
}

impl Related<super::chat_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
