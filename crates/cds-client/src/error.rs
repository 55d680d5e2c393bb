//! CDS client errors.

use era5_common::CommonError;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CdsError {
    #[error("CDS returned HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("job {job_id} {status}: {message}")]
    JobFailed {
        job_id: String,
        status: String,
        message: String,
    },

    #[error("job {job_id} did not finish within {waited_secs}s")]
    Timeout { job_id: String, waited_secs: u64 },

    #[error("unexpected CDS response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl CdsError {
    /// Whether retrying the same request might succeed.
    ///
    /// Connection problems, timeouts, 5xx and 429 are transient. Failed jobs
    /// and 4xx responses are not.
    pub fn is_transient(&self) -> bool {
        match self {
            CdsError::Http { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            CdsError::Request(e) => e.is_connect() || e.is_timeout() || e.is_body(),
            CdsError::Io(_) => true,
            _ => false,
        }
    }
}

pub type CdsResult<T> = Result<T, CdsError>;
