//! Grid Store
//!
//! Server-side source of truth for the live grid:
//! - [`RecordStore`]: in-memory authoritative collection of entities
//! - [`query`]: filter → sort → paginate over any row set
//! - [`aggregate`]: totals over an arbitrary row set
//! - [`MutationService`]: validated single-field writes and deletions
//!
//! # Example
//!
//! ```rust,ignore
//! use grid_model::{EditableField, EntityId, QueryParams};
//! use grid_store::{seed_entities, MutationService, RecordStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(RecordStore::new(seed_entities(50)));
//! let outcome = store.query(&QueryParams::default().with_page(3));
//! assert_eq!(outcome.rows.len(), 10);
//!
//! let mutations = MutationService::new(store.clone());
//! mutations.update_field(EntityId(1), EditableField::Price, "120.00")?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod aggregate;
pub mod error;
pub mod mutation;
pub mod query;
pub mod seed;
pub mod store;

pub use aggregate::aggregate;
pub use error::{StoreError, Violation};
pub use mutation::{MutationPolicy, MutationService};
pub use query::{query, QueryOutcome, QueryResult};
pub use seed::seed_entities;
pub use store::RecordStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
