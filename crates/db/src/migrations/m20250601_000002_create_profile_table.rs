//! Create profile table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Profile::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Profile::UserId)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Profile::Role)
                            .string_len(10)
                            .not_null()
                            .default("MENTEE"),
                    )
                    .col(ColumnDef::new(Profile::ImageKey).string_len(512))
                    .col(ColumnDef::new(Profile::DisplayName).string_len(20))
                    .col(ColumnDef::new(Profile::Info).text())
                    .col(ColumnDef::new(Profile::PhoneNumber).string_len(15))
                    .col(ColumnDef::new(Profile::WorkingStatus).string_len(20))
                    .col(ColumnDef::new(Profile::Organization).string_len(100))
                    .col(ColumnDef::new(Profile::Designation).string_len(100))
                    .col(ColumnDef::new(Profile::LinkedinUrl).string_len(200))
                    .col(ColumnDef::new(Profile::GithubUrl).string_len(200))
                    .col(ColumnDef::new(Profile::ResumeKey).string_len(512))
                    .col(
                        ColumnDef::new(Profile::TermsAccepted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Profile::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Profile::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_profile_user")
                            .from(Profile::Table, Profile::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: role (mentor listing)
        manager
            .create_index(
                Index::create()
                    .name("idx_profile_role")
                    .table(Profile::Table)
                    .col(Profile::Role)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Profile::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Profile {
    Table,
    UserId,
    Role,
    ImageKey,
    DisplayName,
    Info,
    PhoneNumber,
    WorkingStatus,
    Organization,
    Designation,
    LinkedinUrl,
    GithubUrl,
    ResumeKey,
    TermsAccepted,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
