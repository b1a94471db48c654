//! Create `chat_group`, `chat_group_member` and `chat_group_online` tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChatGroup::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChatGroup::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChatGroup::GroupName).string_len(128).not_null())
                    .col(ColumnDef::new(ChatGroup::GroupchatName).string_len(128))
                    .col(ColumnDef::new(ChatGroup::AdminId).string_len(32))
                    .col(
                        ColumnDef::new(ChatGroup::IsPrivate)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(ChatGroup::MeetingId).string_len(256))
                    .col(
                        ColumnDef::new(ChatGroup::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_group_admin")
                            .from(ChatGroup::Table, ChatGroup::AdminId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: group_name
        manager
            .create_index(
                Index::create()
                    .name("idx_chat_group_group_name")
                    .table(ChatGroup::Table)
                    .col(ChatGroup::GroupName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_chat_group_admin_id")
                    .table(ChatGroup::Table)
                    .col(ChatGroup::AdminId)
                    .to_owned(),
            )
            .await?;

        // Members: composite primary key makes joining idempotent
        manager
            .create_table(
                Table::create()
                    .table(ChatGroupMember::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ChatGroupMember::GroupId).string_len(32).not_null())
                    .col(ColumnDef::new(ChatGroupMember::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(ChatGroupMember::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(ChatGroupMember::GroupId)
                            .col(ChatGroupMember::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_group_member_group")
                            .from(ChatGroupMember::Table, ChatGroupMember::GroupId)
                            .to(ChatGroup::Table, ChatGroup::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_group_member_user")
                            .from(ChatGroupMember::Table, ChatGroupMember::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_chat_group_member_user_id")
                    .table(ChatGroupMember::Table)
                    .col(ChatGroupMember::UserId)
                    .to_owned(),
            )
            .await?;

        // Presence set
        manager
            .create_table(
                Table::create()
                    .table(ChatGroupOnline::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ChatGroupOnline::GroupId).string_len(32).not_null())
                    .col(ColumnDef::new(ChatGroupOnline::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(ChatGroupOnline::Since)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(ChatGroupOnline::GroupId)
                            .col(ChatGroupOnline::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_group_online_group")
                            .from(ChatGroupOnline::Table, ChatGroupOnline::GroupId)
                            .to(ChatGroup::Table, ChatGroup::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_group_online_user")
                            .from(ChatGroupOnline::Table, ChatGroupOnline::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChatGroupOnline::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChatGroupMember::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChatGroup::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ChatGroup {
    Table,
    Id,
    GroupName,
    GroupchatName,
    AdminId,
    IsPrivate,
    MeetingId,
    CreatedAt,
}

#[derive(Iden)]
enum ChatGroupMember {
    Table,
    GroupId,
    UserId,
    JoinedAt,
}

#[derive(Iden)]
enum ChatGroupOnline {
    Table,
    GroupId,
    UserId,
    Since,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
