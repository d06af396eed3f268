//! Outcome records published to the result queue.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::job::Job;

/// What a worker produced for one job.
///
/// `error` is set when the tool could not be launched or exited unsuccessfully;
/// `output` still carries whatever the tool printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub job: Job,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobResult {
    pub fn success(job: Job, output: impl Into<String>) -> Self {
        Self {
            job,
            output: output.into(),
            error: None,
        }
    }

    pub fn failure(job: Job, output: impl Into<String>, error: impl ToString) -> Self {
        Self {
            job,
            output: output.into(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
