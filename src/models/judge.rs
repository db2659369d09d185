//! Wire types exchanged with the external judge (Judge0 API shape).

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use super::{SubmissionStatus, TestCaseOutcome};

/// Judge0 status ids that are still in flight.
pub const STATUS_IN_QUEUE: i32 = 1;
pub const STATUS_PROCESSING: i32 = 2;
/// The only status id that counts as a pass.
pub const STATUS_ACCEPTED: i32 = 3;

/// Execution request posted to the judge for one test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeSubmissionRequest {
    pub source_code: String,
    pub language_id: i32,
    pub stdin: String,
    pub expected_output: String,
    pub callback_url: String,
}

/// Synchronous accept response from the judge.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JudgeAcceptResponse {
    pub token: Option<String>,
}

/// Status object inside a judge callback.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JudgeCallbackStatus {
    pub id: i32,
    #[serde(default)]
    pub description: Option<String>,
}

/// Completion event the judge PUTs/POSTs to the callback URL.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JudgeCallback {
    pub status: JudgeCallbackStatus,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub compile_output: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Seconds; Judge0 sends this as a string such as `"0.004"`.
    #[serde(default, deserialize_with = "number_or_string")]
    #[schema(value_type = Option<f64>)]
    pub time: Option<f64>,
    /// Kilobytes.
    #[serde(default)]
    pub memory: Option<i64>,
    #[serde(default)]
    pub token: Option<String>,
}

impl JudgeCallback {
    /// Reject payloads whose status cannot be interpreted.
    pub fn validate(&self) -> Result<(), String> {
        if self.status.id < STATUS_IN_QUEUE {
            return Err(format!("status.id {} is not a judge status", self.status.id));
        }
        if let Some(time) = self.time
            && (time.is_nan() || time < 0.0)
        {
            return Err("time must be a non-negative number".to_string());
        }
        if let Some(memory) = self.memory
            && memory < 0
        {
            return Err("memory must be non-negative".to_string());
        }
        Ok(())
    }

    pub fn outcome(&self) -> TestCaseOutcome {
        outcome_for_status(self.status.id)
    }

    /// Description sent by the judge, or the canonical one for the id.
    pub fn status_text(&self) -> String {
        self.status
            .description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| describe_status(self.status.id).to_string())
    }
}

/// Body returned to the judge after a callback was processed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub result_id: uuid::Uuid,
    /// applied | duplicate | progress | ignored
    pub disposition: String,
    /// Aggregate status of the owning submission after this callback.
    pub submission_status: SubmissionStatus,
}

/// Map a judge status id onto the tri-state outcome.
pub fn outcome_for_status(status_id: i32) -> TestCaseOutcome {
    match status_id {
        STATUS_IN_QUEUE | STATUS_PROCESSING => TestCaseOutcome::Pending,
        STATUS_ACCEPTED => TestCaseOutcome::Passed,
        _ => TestCaseOutcome::Failed,
    }
}

/// Canonical Judge0 status descriptions.
pub fn describe_status(status_id: i32) -> &'static str {
    match status_id {
        1 => "In Queue",
        2 => "Processing",
        3 => "Accepted",
        4 => "Wrong Answer",
        5 => "Time Limit Exceeded",
        6 => "Compilation Error",
        7 => "Runtime Error (SIGSEGV)",
        8 => "Runtime Error (SIGXFSZ)",
        9 => "Runtime Error (SIGFPE)",
        10 => "Runtime Error (SIGABRT)",
        11 => "Runtime Error (NZEC)",
        12 => "Runtime Error (Other)",
        13 => "Internal Error",
        14 => "Exec Format Error",
        _ => "Unknown",
    }
}

fn number_or_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        String(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrString::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid time value '{}'", s))),
    }
}
