//! SeaORM entity definitions.

pub mod submission;
pub mod test_case_result;
