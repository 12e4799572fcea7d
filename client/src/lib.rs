pub mod backend;
pub mod client;

pub use backend::{TableActions, TableQueries};
pub use client::Client;
use thiserror::Error;

/// Error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("failed: {0}")]
    Failed(reqwest::StatusCode),
    #[error("failed: {status}: {body}")]
    FailedWithBody {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
