//! Grid Client
//!
//! Client half of the live grid:
//! - [`Synchronizer`]: optimistic cell edits reconciled against the server
//! - [`CellMachine`]: the per-cell `Viewing → Editing → Pending → Reverting` machine
//! - [`GridController`]: sorting, debounced search and paging with
//!   cancellation of superseded requests
//! - [`GridTransport`]: the three HTTP calls, with a reqwest implementation
//! - [`fragment`]: parsing the server's `data-*` annotated markup
//!
//! # Example
//!
//! ```rust,ignore
//! use grid_client::{CellKey, ClientConfig, GridController, HttpTransport, Synchronizer};
//! use grid_model::{EditableField, EntityId, QueryParams};
//! use std::sync::Arc;
//!
//! let transport = Arc::new(HttpTransport::new("http://127.0.0.1:8080")?);
//! let sync = Synchronizer::new(transport, presenter, ClientConfig::default());
//! let controller = GridController::new(sync.clone(), QueryParams::default());
//! controller.reload().await??;
//!
//! let key = CellKey::new(EntityId(1), EditableField::Price);
//! sync.begin_edit(key)?;
//! sync.update_draft(key, "150.00")?;
//! sync.commit_edit(key)?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cell;
pub mod config;
pub mod controller;
pub mod error;
pub mod focus;
pub mod fragment;
pub mod presenter;
pub mod sync;
pub mod task;
pub mod transport;
pub mod view;

pub use cell::{
    CellDisplay, CellKey, CellMachine, CellPhase, CommitDecision, EditStatus, PendingEdit,
    Resolution, Ticket,
};
pub use config::ClientConfig;
pub use controller::{GridController, Navigation};
pub use error::ClientError;
pub use focus::FocusToken;
pub use fragment::{parse_row_fragment, parse_table_fragment, RowFragment, TableFragment};
pub use presenter::{CellObserver, Presenter};
pub use sync::{Commit, Synchronizer};
pub use task::CancellableTask;
pub use transport::{classify, GridTransport, HttpResponse, HttpTransport};
pub use view::{display_totals, effective_row, EffectiveRow, GridView};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
