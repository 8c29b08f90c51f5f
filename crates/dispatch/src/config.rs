//! Receiver configuration.

use serde::{Deserialize, Serialize};

use crate::protocol::ResultCode;

/// Environment variable overriding [`ReceiverConfig::worker_name`].
pub const WORKER_NAME_ENV: &str = "JOBBRIDGE_WORKER_NAME";

/// Job receiver configuration.
///
/// The wire contract (transaction code, token, reserved keys) is not
/// configurable; this only covers local policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Thread name for job workers
    pub worker_name: String,
    /// Reported when a fired job's parameters cannot be decoded
    pub invalid_job_result: ResultCode,
    /// Reported when a job fires while the same tag is still running
    pub duplicate_job_result: ResultCode,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            worker_name: "jobbridge-worker".to_string(),
            invalid_job_result: ResultCode::FailNoRetry,
            duplicate_job_result: ResultCode::FailRetry,
        }
    }
}

impl ReceiverConfig {
    /// Defaults, with overrides from the environment.
    ///
    /// A blank value keeps the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(name) = lookup(WORKER_NAME_ENV)
            && !name.trim().is_empty()
        {
            config.worker_name = name;
        }
        config
    }

    pub fn with_worker_name(mut self, name: impl Into<String>) -> Self {
        self.worker_name = name.into();
        self
    }

    pub fn with_invalid_job_result(mut self, code: ResultCode) -> Self {
        self.invalid_job_result = code;
        self
    }

    pub fn with_duplicate_job_result(mut self, code: ResultCode) -> Self {
        self.duplicate_job_result = code;
        self
    }
}
