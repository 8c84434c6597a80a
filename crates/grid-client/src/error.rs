//! Error types for the grid client

use crate::cell::CellKey;
use grid_model::EntityId;

/// Client-side failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a response
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a 4xx/5xx status
    #[error("server rejected the request ({status}): {message}")]
    ServerRejected {
        /// HTTP status code
        status: u16,
        /// Text content of the error fragment
        message: String,
    },

    /// A success response whose body could not be understood
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A newer request for the same target replaced this one
    #[error("request superseded")]
    RequestSuperseded,

    /// The cell is showing a failure and cannot be edited yet
    #[error("cell {0} is reverting")]
    CellBusy(CellKey),

    /// No row with this id in the current view
    #[error("row {0} is not in the current view")]
    UnknownRow(EntityId),

    /// The operation needs an open editor
    #[error("cell {0} is not being edited")]
    NotEditing(CellKey),
}

impl ClientError {
    /// Short text for the cell's error indicator
    #[must_use]
    pub fn indicator_text(&self) -> String {
        match self {
            Self::ServerRejected { message, .. } if !message.is_empty() => message.clone(),
            Self::ServerRejected { status, .. } => format!("Update failed ({status})"),
            Self::Transport(_) => "Network error".to_string(),
            Self::MalformedResponse(_) => "Unexpected response".to_string(),
            other => other.to_string(),
        }
    }
}
