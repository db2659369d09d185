//! Problem content collaborator: test-case corpus and boilerplate lookup.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

/// One (input, expected output) pair for a problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub output: String,
}

/// Per-language template for a problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boilerplate {
    /// Stub shown to the user.
    pub code: String,
    /// Compilable program that contains `code` verbatim.
    #[serde(alias = "fullcode")]
    pub full_code: String,
}

impl Boilerplate {
    /// Replace the first occurrence of the stub with the user's code.
    ///
    /// Returns None if the full program does not contain the stub.
    pub fn splice(&self, user_code: &str) -> Option<String> {
        if self.code.is_empty() || !self.full_code.contains(&self.code) {
            return None;
        }
        Some(self.full_code.replacen(&self.code, user_code, 1))
    }
}

/// Source of problem content, addressed by problem slug.
#[async_trait]
pub trait ProblemCatalog: Send + Sync {
    /// Ordered test-case corpus. Empty when the problem has none.
    async fn test_cases(&self, problem_slug: &str) -> AppResult<Vec<TestCase>>;

    /// Boilerplate for one language, or None when none exists.
    async fn boilerplate(&self, problem_slug: &str, language_id: i32)
    -> AppResult<Option<Boilerplate>>;
}

/// Object key of a problem's test-case corpus.
pub fn corpus_key(problem_slug: &str) -> String {
    format!("problems/{}/input_output.json", problem_slug)
}

/// Object key of a problem's boilerplate for a language.
pub fn boilerplate_key(problem_slug: &str, language_id: i32) -> String {
    format!("problems/{}/boilerplate/{}.json", problem_slug, language_id)
}
