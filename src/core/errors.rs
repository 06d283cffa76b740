use std::result::Result as StdResult;

use thiserror::Error;

/// Unified error type for the service, storage and configuration layers.
///
/// The commission engine itself never fails; it reports problems inside its `Decision`.
#[derive(Error, Debug)]
pub enum CrmError {
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("{message} ({code})")]
    InvalidState { code: &'static str, message: String },
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Persistence error: {0}")]
    Storage(String),
    #[error("No expense book loaded")]
    BookNotLoaded,
}

impl CrmError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        CrmError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn invalid_state(code: &'static str, message: impl Into<String>) -> Self {
        CrmError::InvalidState {
            code,
            message: message.into(),
        }
    }

    /// Machine-readable code for state conflicts, if any.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            CrmError::InvalidState { code, .. } => Some(code),
            _ => None,
        }
    }
}

pub type Result<T> = StdResult<T, CrmError>;

impl From<std::io::Error> for CrmError {
    fn from(err: std::io::Error) -> Self {
        CrmError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for CrmError {
    fn from(err: serde_json::Error) -> Self {
        CrmError::Storage(err.to_string())
    }
}
