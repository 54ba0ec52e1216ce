//! CLI exit code registry.
//!
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad arguments, ambiguous merge columns) |
//! | 3    | Catalog missing, unreadable or invalid               |
//! | 4    | Unknown table or column                              |
//! | 5    | A table's data file could not be loaded              |

use casco_config::ConfigError;
use casco_tables::TableError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments or a request the data cannot answer as asked.
pub const EXIT_USAGE: u8 = 2;

/// Catalog not found, unreadable, malformed or failing validation.
pub const EXIT_CATALOG: u8 = 3;

/// A table or column name that does not exist.
pub const EXIT_UNKNOWN_NAME: u8 = 4;

/// A data file is missing, unreadable or malformed.
pub const EXIT_DATA_LOAD: u8 = 5;

pub fn table_exit_code(err: &TableError) -> u8 {
    match err {
        TableError::UnknownTable { .. } | TableError::UnknownColumn { .. } => EXIT_UNKNOWN_NAME,
        TableError::DataLoad { .. } => EXIT_DATA_LOAD,
        TableError::DuplicateName(_) | TableError::InvalidConfig { .. } => EXIT_CATALOG,
        TableError::AmbiguousColumn { .. } => EXIT_USAGE,
        TableError::NotNumeric { .. } => EXIT_ERROR,
    }
}

pub fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::Table(inner) => table_exit_code(inner),
        ConfigError::Read { .. }
        | ConfigError::Parse(_)
        | ConfigError::Validation(_)
        | ConfigError::NotFound { .. }
        | ConfigError::Intent(_) => EXIT_CATALOG,
    }
}
