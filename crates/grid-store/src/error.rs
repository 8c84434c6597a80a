//! Error types for the record store
//!
//! Every failure a write can produce:
//! - Stale identifiers
//! - Values outside a field's domain
//! - The deliberate failure sentinel

use grid_model::{EditableField, EntityId};

/// Store operation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No entity with this id
    #[error("entity {0} not found")]
    NotFound(EntityId),

    /// Value outside the field's domain
    #[error("invalid {field}: {violation}")]
    Validation {
        /// Field being written
        field: EditableField,
        /// What was wrong with the value
        violation: Violation,
    },

    /// Value equals the failure sentinel
    #[error("server error while writing {field} = {value}")]
    SimulatedFailure {
        /// Field being written
        field: EditableField,
        /// Normalized value that triggered the failure
        value: String,
    },
}

impl StoreError {
    /// Caller's fault (maps to a 4xx status)
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Validation { .. })
    }
}

/// Reason a value was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    /// Not a finite number
    #[error("{0:?} is not a number")]
    NotANumber(String),

    /// Below the field's lower bound
    #[error("{value} is below the minimum {min}")]
    BelowMinimum {
        /// Offending value
        value: String,
        /// Lower bound
        min: String,
    },

    /// Above the field's upper bound
    #[error("{value} exceeds the maximum {max}")]
    AboveMaximum {
        /// Offending value
        value: String,
        /// Upper bound
        max: String,
    },
}
