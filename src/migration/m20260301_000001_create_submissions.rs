//! Create submissions table.
//!
//! One row per run/submit request. Rows are never deleted.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Submissions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Submissions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Submissions::UserId).string().not_null())
                    .col(ColumnDef::new(Submissions::ProblemSlug).string().not_null())
                    .col(ColumnDef::new(Submissions::LanguageId).integer().not_null())
                    .col(ColumnDef::new(Submissions::SourceCode).text().not_null())
                    .col(
                        ColumnDef::new(Submissions::Kind)
                            .string_len(16)
                            .not_null()
                            .default("submit"),
                    )
                    .col(
                        ColumnDef::new(Submissions::Status)
                            .string_len(20)
                            .not_null()
                            .default("queued"),
                    )
                    .col(
                        ColumnDef::new(Submissions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Submissions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Submissions::FinalizedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Sweeper scans processing rows by age
        manager
            .create_index(
                Index::create()
                    .name("idx_submissions_status_created_at")
                    .table(Submissions::Table)
                    .col(Submissions::Status)
                    .col(Submissions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_submissions_user_id")
                    .table(Submissions::Table)
                    .col(Submissions::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Submissions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Submissions {
    Table,
    Id,
    UserId,
    ProblemSlug,
    LanguageId,
    SourceCode,
    Kind,
    Status,
    CreatedAt,
    UpdatedAt,
    FinalizedAt,
}
