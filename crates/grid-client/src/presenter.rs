//! Presentation seam
//!
//! The synchronizer never reaches into a document. Grid-level updates go to a
//! [`Presenter`]; per-cell updates go to the observer registered for that
//! [`CellKey`].

use crate::cell::{CellDisplay, CellKey};
use crate::view::GridView;
use grid_model::{AggregateTotals, EntityId, Money};
use std::sync::Arc;

/// Receives grid-level render instructions
pub trait Presenter: Send + Sync {
    /// Replace the whole table with a new confirmed view
    fn replace_view(&self, view: &GridView);

    /// Show a row's (possibly speculative) subtotal
    fn row_subtotal(&self, row: EntityId, subtotal: Money);

    /// Show the (possibly speculative) totals
    fn totals(&self, totals: &AggregateTotals);

    /// Move focus back to a cell's display surface
    fn focus_cell(&self, key: CellKey);

    /// Focus a text input and place the caret
    fn focus_input(&self, field: &str, caret: usize);

    /// Current value of a text input, if it exists in the view
    fn input_value(&self, field: &str) -> Option<String>;

    /// Record a navigation in browser history
    fn push_history(&self, query: &str);
}

/// Callback bound to one cell
pub type CellObserver = Arc<dyn Fn(CellKey, &CellDisplay) + Send + Sync>;
