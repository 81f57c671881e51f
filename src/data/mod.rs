//! Data ingestion
//!
//! Reads delimited transaction files with polars and resolves an explicit
//! [`Schema`] once, so later stages work against declared column kinds.

mod config;
mod dataset;
mod loader;
mod schema;

pub use config::DataConfig;
pub use dataset::RawDataset;
pub use loader::{ColumnInfo, DataLoader, DatasetInfo};
pub use schema::{ColumnKind, ColumnSpec, Schema};
