use thiserror::Error;

#[derive(Error, Debug)]
pub enum HubError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("Invalid field name '{field}'")]
    InvalidField { field: String },

    #[error("Document '{path}' not found")]
    NotFound { path: String },

    #[error("Identity '{identity}' may not read '{path}'")]
    AccessDenied { identity: String, path: String },

    #[error("No signed-in session")]
    NotSignedIn,

    #[error("Chat endpoint error: {0}")]
    Transport(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type HubResult<T> = Result<T, HubError>;
