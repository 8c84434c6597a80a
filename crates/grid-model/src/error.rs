//! Parse errors for model values

/// Failure to interpret a textual value as a model type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Not a finite decimal number
    #[error("not a number: {0:?}")]
    NotANumber(String),

    /// Not a known field name
    #[error("unknown field: {0:?}")]
    UnknownField(String),

    /// Not a known sort direction
    #[error("unknown sort direction: {0:?}")]
    UnknownDirection(String),

    /// Field cannot be edited
    #[error("field is not editable: {0:?}")]
    NotEditable(String),
}
