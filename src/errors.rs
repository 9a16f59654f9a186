//! Typed error hierarchy for Idea Playground.
//!
//! - `PlaygroundError`: store and API failures, classified for HTTP status
//! - `ClientError`: board client failures talking to the server
//! - `ColumnError`: readiness scale that cannot be turned into columns

use thiserror::Error;

/// Errors from the idea store and the HTTP API.
#[derive(Debug, Error)]
pub enum PlaygroundError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Title already exists: {title}")]
    DuplicateTitle { title: String },

    #[error("Idea {id} not found")]
    NotFound { id: String },

    #[error("Database error: {0}")]
    Database(#[source] anyhow::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,
}

/// Errors from the board client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode server response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Title '{title}' is already used by idea {conflicting_id}")]
    TitleTaken {
        title: String,
        conflicting_id: String,
    },

    #[error("Idea {id} is not on the board")]
    UnknownIdea { id: String },

    #[error("Invalid server URL '{url}'")]
    InvalidBaseUrl { url: String },
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api { status: 404, .. })
    }
}

/// Errors turning a registry readiness scale into board columns.
#[derive(Debug, Error, PartialEq)]
pub enum ColumnError {
    #[error("Registry has no readiness scale")]
    MissingScale,

    #[error("Readiness scale is empty")]
    EmptyScale,

    #[error("Invalid readiness range '{range}'")]
    InvalidRange { range: String },

    #[error("Readiness range '{range}' has a non-text description")]
    InvalidDescription { range: String },

    #[error("Readiness ranges '{previous}' and '{next}' overlap or leave a gap")]
    NotContiguous { previous: String, next: String },
}
