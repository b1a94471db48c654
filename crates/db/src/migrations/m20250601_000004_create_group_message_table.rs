//! Create `group_message` table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GroupMessage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroupMessage::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GroupMessage::GroupId).string_len(32).not_null())
                    .col(ColumnDef::new(GroupMessage::AuthorId).string_len(32).not_null())
                    .col(ColumnDef::new(GroupMessage::Body).string_len(300))
                    .col(ColumnDef::new(GroupMessage::FileKey).string_len(512))
                    .col(ColumnDef::new(GroupMessage::FileName).string_len(256))
                    .col(ColumnDef::new(GroupMessage::FileSize).big_integer())
                    .col(ColumnDef::new(GroupMessage::IsImage).boolean())
                    .col(
                        ColumnDef::new(GroupMessage::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_message_group")
                            .from(GroupMessage::Table, GroupMessage::GroupId)
                            .to(ChatGroup::Table, ChatGroup::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_message_author")
                            .from(GroupMessage::Table, GroupMessage::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Listing is always newest-first within a group
        manager
            .create_index(
                Index::create()
                    .name("idx_group_message_group_created")
                    .table(GroupMessage::Table)
                    .col(GroupMessage::GroupId)
                    .col((GroupMessage::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_group_message_author_id")
                    .table(GroupMessage::Table)
                    .col(GroupMessage::AuthorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GroupMessage::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum GroupMessage {
    Table,
    Id,
    GroupId,
    AuthorId,
    Body,
    FileKey,
    FileName,
    FileSize,
    IsImage,
    CreatedAt,
}

#[derive(Iden)]
enum ChatGroup {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
