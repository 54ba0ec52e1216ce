//! Catalog configuration for casco.
//!
//! A catalog is a TOML file naming the data root, the tables, the intent
//! rules and the prompt options. See [`Catalog`] for the layout and
//! [`discover`] for where it is looked up.

pub mod catalog;
pub mod discovery;
pub mod error;

pub use catalog::{Catalog, EntitySource, IntentSection};
pub use discovery::{discover, user_catalog_path, CATALOG_ENV, LOCAL_CATALOG};
pub use error::ConfigError;
