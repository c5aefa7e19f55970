//! Record projector for the order notification dispatcher.
//!
//! This crate provides:
//! - Field-path contracts per event kind
//! - The `DataSource` read interface with in-memory and HTTP implementations
//! - Normalization of raw rows into domain records
//! - `RecordProjector`, the single read path used by handlers and the tax export

pub mod contract;
pub mod error;
pub mod http;
pub mod memory;
pub mod normalize;
pub mod projector;
pub mod source;

pub use contract::{Entity, FieldContract};
pub use error::{ProjectorError, Result};
pub use http::HttpDataSource;
pub use memory::{InMemoryDataSource, RecordedQuery, project_fields};
pub use projector::{Record, RecordProjector};
pub use source::{DataSource, QueryFilter};
