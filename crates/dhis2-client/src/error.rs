//! DHIS2 client errors.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Dhis2Error {
    #[error("DHIS2 returned HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid JSON from DHIS2: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid geometry for org unit {id}: {reason}")]
    Geometry { id: String, reason: String },

    #[error("unknown import strategy '{0}', expected CREATE_AND_UPDATE, CREATE or UPDATE")]
    UnknownImportStrategy(String),

    #[error("unexpected DHIS2 response: {0}")]
    InvalidResponse(String),
}

pub type Dhis2Result<T> = Result<T, Dhis2Error>;
