//! Submission entity for SeaORM.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "submissions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub problem_slug: String,
    pub language_id: i32,
    #[sea_orm(column_type = "Text")]
    pub source_code: String,
    /// run | submit
    pub kind: String,
    /// queued | processing | accepted | wrong_answer | errored
    pub status: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub finalized_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::test_case_result::Entity")]
    TestCaseResults,
}

impl Related<super::test_case_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestCaseResults.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
