use serde::{Deserialize, Serialize};

use crate::error::TableError;

/// Cell texts treated as missing when a table does not list its own.
pub const DEFAULT_NA_VALUES: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null"];

// ---------------------------------------------------------------------------
// Table registration record
// ---------------------------------------------------------------------------

/// Static registration record for one named table.
///
/// A table is backed either by a CSV `file` (relative to the store's data
/// root) or by a `union` of previously registered file tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Identifier columns; informative, never enforced as unique.
    #[serde(default)]
    pub key_columns: Vec<String>,
    #[serde(default)]
    pub format: CsvFormat,
    /// Member tables concatenated top to bottom, in this order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub union: Option<Vec<String>>,
    /// Column added to a union recording each row's member table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_column: Option<String>,
}

impl TableConfig {
    pub fn csv(
        name: impl Into<String>,
        file: impl Into<String>,
        description: impl Into<String>,
        key_columns: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            file: Some(file.into()),
            description: description.into(),
            key_columns: key_columns.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn union(name: impl Into<String>, members: &[&str], tag_column: Option<&str>) -> Self {
        Self {
            name: name.into(),
            union: Some(members.iter().map(|m| m.to_string()).collect()),
            tag_column: tag_column.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: CsvFormat) -> Self {
        self.format = format;
        self
    }

    pub fn is_union(&self) -> bool {
        self.union.is_some()
    }

    /// Checks that need no knowledge of other tables.
    pub fn validate(&self) -> Result<(), TableError> {
        if self.name.trim().is_empty() {
            return Err(TableError::invalid_config(&self.name, "name must not be empty"));
        }

        match (&self.file, &self.union) {
            (Some(_), Some(_)) => {
                return Err(TableError::invalid_config(
                    &self.name,
                    "set either `file` or `union`, not both",
                ))
            }
            (None, None) => {
                return Err(TableError::invalid_config(
                    &self.name,
                    "one of `file` or `union` is required",
                ))
            }
            (Some(file), None) if file.trim().is_empty() => {
                return Err(TableError::invalid_config(&self.name, "`file` must not be empty"))
            }
            (None, Some(members)) if members.is_empty() => {
                return Err(TableError::invalid_config(
                    &self.name,
                    "`union` needs at least one member table",
                ))
            }
            _ => {}
        }

        if self.tag_column.is_some() && self.union.is_none() {
            return Err(TableError::invalid_config(
                &self.name,
                "`tag_column` only applies to `union` tables",
            ));
        }

        self.format.validate(&self.name)
    }
}

// ---------------------------------------------------------------------------
// CSV reading options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// UTF-8, falling back to Windows-1252 when the bytes are not valid UTF-8.
    #[default]
    Utf8,
    /// Always decode as Windows-1252 (a superset of Latin-1).
    #[serde(alias = "latin-1", alias = "windows-1252", alias = "cp1252")]
    Latin1,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CsvFormat {
    /// Field separator; sniffed from the first lines when absent.
    pub delimiter: Option<char>,
    pub encoding: TextEncoding,
    pub has_headers: bool,
    /// Column names for header-less files (required then), or overrides
    /// for the header row when the file has one.
    pub columns: Vec<String>,
    pub na_values: Option<Vec<String>>,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: TextEncoding::Utf8,
            has_headers: true,
            columns: Vec::new(),
            na_values: None,
        }
    }
}

impl CsvFormat {
    pub fn delimited(delimiter: char) -> Self {
        Self {
            delimiter: Some(delimiter),
            ..Self::default()
        }
    }

    pub fn headerless(columns: &[&str]) -> Self {
        Self {
            has_headers: false,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn na_values(&self) -> Vec<String> {
        match &self.na_values {
            Some(values) => values.clone(),
            None => DEFAULT_NA_VALUES.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Delimiter as the single byte the CSV reader wants.
    pub fn delimiter_byte(&self) -> Option<u8> {
        self.delimiter.and_then(|c| u8::try_from(c).ok())
    }

    fn validate(&self, table: &str) -> Result<(), TableError> {
        if let Some(c) = self.delimiter {
            if !c.is_ascii() || c == '"' || c == '\n' || c == '\r' {
                return Err(TableError::invalid_config(
                    table,
                    format!("delimiter {c:?} must be a single ASCII character other than quote or newline"),
                ));
            }
        }
        if !self.has_headers && self.columns.is_empty() {
            return Err(TableError::invalid_config(
                table,
                "`has_headers = false` requires `columns`",
            ));
        }
        Ok(())
    }
}
