//! Grid Model
//!
//! Shared vocabulary between the query server and the reconciling client:
//! - [`Entity`] records and their fixed-point [`Money`] prices
//! - Field enums for search, sort and editing
//! - [`QueryParams`] with round-trippable URL encoding
//! - [`AggregateTotals`] and [`PageInfo`] summaries

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod entity;
mod error;
mod field;
mod money;
mod query;
mod totals;

pub use entity::{compare_keys, Entity, EntityId, SortKey};
pub use error::ParseError;
pub use field::{EditableField, EntityField, SortDirection, SortField};
pub use money::Money;
pub use query::{PageLimits, QueryParams, RawQueryParams};
pub use totals::{AggregateTotals, PageInfo};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
