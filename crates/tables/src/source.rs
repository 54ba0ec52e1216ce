// Table sources: where a registered table's rows come from.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{CsvFormat, TextEncoding};
use crate::error::TableError;
use crate::table::Table;

/// Capability to produce a table's rows.
///
/// The store calls `load` at most once per registration; the query layer
/// never sees the source, so a database-backed source can replace CSV files
/// without touching it.
pub trait TableSource: Send + Sync {
    fn load(&self, table: &str) -> Result<Table, TableError>;

    /// Human-readable location for logs and error messages.
    fn location(&self) -> String;
}

// ---------------------------------------------------------------------------
// CSV files
// ---------------------------------------------------------------------------

pub struct CsvSource {
    path: PathBuf,
    format: CsvFormat,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>, format: CsvFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableSource for CsvSource {
    fn load(&self, table: &str) -> Result<Table, TableError> {
        let start = Instant::now();
        let bytes = std::fs::read(&self.path)
            .map_err(|e| TableError::data_load(table, self.location(), e))?;

        let content = decode(&bytes, self.format.encoding, table, &self.path);
        let parsed = parse_csv(table, &content, &self.format)
            .map_err(|reason| TableError::data_load(table, self.location(), reason))?;

        log::info!(
            "loaded table '{}' from {} ({} rows, {} columns) in {:?}",
            table,
            self.path.display(),
            parsed.len(),
            parsed.columns().len(),
            start.elapsed()
        );
        Ok(parsed)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Decode file bytes per the configured encoding.
///
/// UTF-8 files that turn out not to be valid UTF-8 are re-read as
/// Windows-1252, which is what spreadsheet exports usually are.
fn decode(bytes: &[u8], encoding: TextEncoding, table: &str, path: &Path) -> String {
    let text = match encoding {
        TextEncoding::Latin1 => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        TextEncoding::Utf8 => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => {
                log::warn!(
                    "table '{}': {} is not valid UTF-8, decoding as Windows-1252",
                    table,
                    path.display()
                );
                encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
            }
        },
    };
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

fn parse_csv(table: &str, content: &str, format: &CsvFormat) -> Result<Table, String> {
    let delimiter = format
        .delimiter_byte()
        .unwrap_or_else(|| sniff_delimiter(content));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(false)
        .from_reader(content.as_bytes());

    let mut records = reader.records();

    let headers: Vec<String> = if format.has_headers {
        let header = match records.next() {
            Some(record) => record.map_err(|e| e.to_string())?,
            None => return Err("file is empty (no header row)".to_string()),
        };
        if format.columns.is_empty() {
            header.iter().map(|h| h.trim().to_string()).collect()
        } else if format.columns.len() == header.len() {
            format.columns.clone()
        } else {
            return Err(format!(
                "header has {} columns but {} column names are configured",
                header.len(),
                format.columns.len()
            ));
        }
    } else {
        format.columns.clone()
    };

    if let Some(dup) = first_duplicate(&headers) {
        return Err(format!("duplicate column name '{dup}'"));
    }

    let mut rows = Vec::new();
    for (line, record) in records.enumerate() {
        let record = record.map_err(|e| e.to_string())?;
        if record.len() != headers.len() {
            return Err(format!(
                "record {} has {} fields, expected {}",
                line + 1,
                record.len(),
                headers.len()
            ));
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table::from_text(table, headers, rows, &format.na_values()))
}

fn first_duplicate(names: &[String]) -> Option<&str> {
    names
        .iter()
        .enumerate()
        .find(|(i, name)| names[..*i].contains(name))
        .map(|(_, name)| name.as_str())
}

const DELIMITER_CANDIDATES: [u8; 4] = [b'\t', b';', b',', b'|'];
const SNIFF_LINES: usize = 10;

/// Guess the field delimiter of a CSV text, falling back to a comma.
///
/// A candidate scores `agreeing lines * fields` over the first lines of the
/// file, where agreeing lines split into as many fields as the first one.
/// Candidates that leave the first line whole are skipped.
pub fn sniff_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content.lines().take(SNIFF_LINES).collect();

    let mut winner = (b',', 0usize);
    for delimiter in DELIMITER_CANDIDATES {
        let widths: Vec<usize> = sample.iter().map(|line| field_count(line, delimiter)).collect();
        let Some(&fields) = widths.first() else {
            break;
        };
        if fields < 2 {
            continue;
        }
        let score = widths.iter().filter(|&&w| w == fields).count() * fields;
        if score > winner.1 {
            winner = (delimiter, score);
        }
    }
    winner.0
}

/// Fields in one line split on `delimiter`, honouring quotes.
fn field_count(line: &str, delimiter: u8) -> usize {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(Result::ok)
        .map_or(1, |record| record.len())
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// A table built in code; loading hands out a copy named after the registration.
pub struct MemorySource {
    table: Table,
}

impl MemorySource {
    pub fn new(table: Table) -> Self {
        Self { table }
    }
}

impl TableSource for MemorySource {
    fn load(&self, table: &str) -> Result<Table, TableError> {
        Ok(self.table.clone().renamed(table))
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}
