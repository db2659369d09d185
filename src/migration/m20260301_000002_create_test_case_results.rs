//! Create test_case_results table.

use sea_orm_migration::prelude::*;

use super::m20260301_000001_create_submissions::Submissions;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TestCaseResults::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TestCaseResults::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TestCaseResults::SubmissionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TestCaseResults::Position)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TestCaseResults::Outcome)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(TestCaseResults::JudgeStatusCode).integer())
                    .col(ColumnDef::new(TestCaseResults::JudgeStatusText).string())
                    .col(ColumnDef::new(TestCaseResults::JudgeToken).string())
                    .col(ColumnDef::new(TestCaseResults::Stdout).text())
                    .col(ColumnDef::new(TestCaseResults::Stderr).text())
                    .col(ColumnDef::new(TestCaseResults::CompileOutput).text())
                    .col(ColumnDef::new(TestCaseResults::Message).text())
                    .col(ColumnDef::new(TestCaseResults::TimeSeconds).double())
                    .col(ColumnDef::new(TestCaseResults::MemoryKb).big_integer())
                    .col(
                        ColumnDef::new(TestCaseResults::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(TestCaseResults::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(TestCaseResults::Table, TestCaseResults::SubmissionId)
                            .to(Submissions::Table, Submissions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Exactly one placeholder per test case
        manager
            .create_index(
                Index::create()
                    .name("idx_test_case_results_submission_position")
                    .table(TestCaseResults::Table)
                    .col(TestCaseResults::SubmissionId)
                    .col(TestCaseResults::Position)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TestCaseResults::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TestCaseResults {
    Table,
    Id,
    SubmissionId,
    Position,
    Outcome,
    JudgeStatusCode,
    JudgeStatusText,
    JudgeToken,
    Stdout,
    Stderr,
    CompileOutput,
    Message,
    TimeSeconds,
    MemoryKb,
    CreatedAt,
    UpdatedAt,
}
