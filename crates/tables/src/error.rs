use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    /// A table with this name is already registered.
    #[error("table '{0}' is already registered")]
    DuplicateName(String),

    /// Lookup of a name that was never registered.
    #[error("unknown table '{name}' (registered: {})", join_or_none(.registered))]
    UnknownTable { name: String, registered: Vec<String> },

    /// Column referenced by a filter, merge or aggregate does not exist.
    #[error("table '{table}': unknown column '{column}' (columns: {})", join_or_none(.available))]
    UnknownColumn {
        table: String,
        column: String,
        available: Vec<String>,
    },

    /// Backing data missing, unreadable or malformed.
    #[error("table '{table}': cannot load {location}: {reason}")]
    DataLoad {
        table: String,
        location: String,
        reason: String,
    },

    /// Combining two tables would give several output columns one name.
    #[error("combining '{left}' with '{right}': ambiguous column names: {}", .columns.join(", "))]
    AmbiguousColumn {
        left: String,
        right: String,
        columns: Vec<String>,
    },

    /// Aggregate requested over a text or date column.
    #[error("table '{table}': column '{column}' is not numeric")]
    NotNumeric { table: String, column: String },

    /// Registration record rejected before any I/O.
    #[error("table '{name}': invalid config: {reason}")]
    InvalidConfig { name: String, reason: String },
}

impl TableError {
    /// The single table an error is about, when there is one.
    ///
    /// Callers that degrade gracefully use this to drop the offending table
    /// from a multi-table request and retry with the rest.
    pub fn table_name(&self) -> Option<&str> {
        match self {
            Self::DuplicateName(name) => Some(name),
            Self::UnknownTable { name, .. } => Some(name),
            Self::UnknownColumn { table, .. } => Some(table),
            Self::DataLoad { table, .. } => Some(table),
            Self::NotNumeric { table, .. } => Some(table),
            Self::InvalidConfig { name, .. } => Some(name),
            Self::AmbiguousColumn { .. } => None,
        }
    }

    pub(crate) fn data_load(
        table: impl Into<String>,
        location: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::DataLoad {
            table: table.into(),
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid_config(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
