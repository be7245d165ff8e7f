use thiserror::Error;

/// Failures raised by the API client, query engine and aggregation pipeline.
#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    DataShape(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Continuation loop: {0}")]
    LoopGuard(String),
}

impl From<reqwest::Error> for WorkloadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WorkloadError::Network(format!("request timed out: {err}"))
        } else {
            WorkloadError::Network(err.to_string())
        }
    }
}

pub type Result<T, E = WorkloadError> = std::result::Result<T, E>;
