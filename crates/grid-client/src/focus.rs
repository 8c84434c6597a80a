//! Focus preservation across view replacement

use crate::presenter::Presenter;

/// Focused input and caret, captured when a request is issued
///
/// Travels with the request that captured it and is consumed on restore, so a
/// token can never be applied twice or to another request's view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusToken {
    field: String,
    caret: usize,
}

impl FocusToken {
    /// Capture an input's identity and caret offset (in characters)
    #[must_use]
    pub fn capture(field: impl Into<String>, caret: usize) -> Self {
        Self {
            field: field.into(),
            caret,
        }
    }

    /// Input identity
    #[inline]
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Refocus the same input in the new view
    ///
    /// The caret is clamped to the new value's length. Returns the applied
    /// offset, or `None` if the input is gone.
    pub fn restore(self, presenter: &dyn Presenter) -> Option<usize> {
        let value = presenter.input_value(&self.field)?;
        let caret = self.caret.min(value.chars().count());
        presenter.focus_input(&self.field, caret);
        Some(caret)
    }
}
