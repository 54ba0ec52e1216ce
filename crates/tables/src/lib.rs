//! `casco-tables`: named CSV-backed tables for the insurance assistant.
//!
//! Tables are registered from static configuration and parsed from disk at
//! most once per process, on first access. Read-only relational helpers
//! (filter, merge, distinct values, concatenation, grouped means) operate on
//! the loaded tables without ever mutating the store.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod query;
pub mod source;
pub mod store;
pub mod table;
pub mod value;

pub use aggregate::{ColumnStats, Trend};
pub use config::{CsvFormat, TableConfig, TextEncoding};
pub use error::TableError;
pub use query::{Collision, Filter, JoinHow, Predicate};
pub use source::{CsvSource, MemorySource, TableSource};
pub use store::{TableInfo, TableStore};
pub use table::{Column, ColumnType, Row, Table};
pub use value::Value;
