use libris_http::error::AppError;
use serde_json::json;
use thiserror::Error;

use super::repository::StoreError;

/// Failures surfaced by the books service.
///
/// An absent book is not an error; lookups return `Option`.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CatalogError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation { field, message } => AppError::validation(
                vec![json!({ "field": field, "error": message })],
                format!("{field} {message}"),
            ),
            CatalogError::Store(StoreError::Duplicate(message)) => AppError::conflict(
                vec![json!({ "error": message })],
                "a matching entity was created concurrently; retry the request",
            ),
            CatalogError::Store(StoreError::UnknownReference(message)) => {
                AppError::bad_request(message)
            }
            CatalogError::Store(other) => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}
