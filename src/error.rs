//! Errors for the fallible shells around the rules core
//!
//! Gameplay operations never return these; they clamp or reject with a
//! boolean. Only parsing and persistence paths surface an `Error`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("seed must be 1-32 alphanumeric characters, got {0:?}")]
    InvalidSeed(String),

    #[error("share link is missing the seed parameter")]
    MissingSeed,

    #[error("invalid share link: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("seed payload is not valid base64: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    #[error("decoded seed is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("unknown telemetry event type {0:?}")]
    UnknownEventType(String),

    #[error("invalid telemetry batch: {0}")]
    InvalidTelemetry(String),

    #[error("storage unavailable")]
    StorageUnavailable,

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
