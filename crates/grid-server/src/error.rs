//! HTTP error mapping
//!
//! Errors never cross the request boundary as panics; each becomes a status
//! code plus an error fragment whose text is for display only.

use grid_store::StoreError;
use warp::http::StatusCode;

/// Request-level failure
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Store rejected the operation
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Request is malformed before reaching the store
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No such route
    #[error("not found")]
    NoRoute,
}

impl ApiError {
    /// HTTP status for this error
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Store(StoreError::NotFound(_)) | ApiError::NoRoute => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::Validation { .. }) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Store(StoreError::SimulatedFailure { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_model::{EditableField, EntityId};
    use grid_store::Violation;

    #[test]
    fn status_classes() {
        assert_eq!(
            ApiError::from(StoreError::NotFound(EntityId(1))).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(StoreError::Validation {
                field: EditableField::Quantity,
                violation: Violation::NotANumber("x".into()),
            })
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert!(ApiError::from(StoreError::SimulatedFailure {
            field: EditableField::Price,
            value: "999.00".into(),
        })
        .status()
        .is_server_error());
    }
}
