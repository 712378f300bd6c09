//! Request-level errors.
//!
//! These never leave the request that caused them: each maps to a status
//! code and becomes the response body.

use thiserror::Error;

use super::response::Reply;

#[derive(Debug, Error)]
pub enum RequestError {
    /// Body could not be parsed (bad JSON on `/debug`)
    #[error("Invalid JSON")]
    Malformed(#[source] serde_json::Error),

    /// Reading the request body or a served file failed
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Anything else, including panics caught at the request boundary
    #[error("{0}")]
    Internal(String),
}

impl RequestError {
    pub fn status(&self) -> u16 {
        match self {
            Self::Malformed(_) => 400,
            Self::Io(_) | Self::Internal(_) => 500,
        }
    }

    /// Caller input problems are not server faults.
    pub fn is_client_error(&self) -> bool {
        self.status() < 500
    }

    pub fn into_reply(self) -> Reply {
        Reply::text(self.status(), self.to_string())
    }
}
