//! Grid Server
//!
//! HTTP surface over the record store. Every response is an embeddable markup
//! fragment:
//! - `GET /table` renders the current page, pagination and totals
//! - `PUT /items/{id}/{field}` writes one field and returns the row + totals
//! - `DELETE /items/{id}` removes a row and returns the refreshed table
//!
//! Failures are reported purely through the status class (4xx/5xx) with an
//! error fragment as display text.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod render;
pub mod routes;
pub mod telemetry;

pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;
pub use render::{escape, HtmlRenderer, MarkupRenderer};
pub use routes::{bind, routes, AppState};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
