use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::TableError;
use crate::value::{parse_date, parse_float, parse_int, Value};

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// Type inferred for a whole column at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Every cell is missing.
    Empty,
    Int,
    Float,
    Date,
    Text,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float | Self::Empty)
    }

    /// Widest type covering already-typed values.
    pub fn of_values<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut kind = Self::Empty;
        for value in values {
            let cell = match value {
                Value::Missing => continue,
                Value::Int(_) => Self::Int,
                Value::Float(_) => Self::Float,
                Value::Date(_) => Self::Date,
                Value::Text(_) => Self::Text,
            };
            kind = match (kind, cell) {
                (Self::Empty, c) => c,
                (a, b) if a == b => a,
                (Self::Int, Self::Float) | (Self::Float, Self::Int) => Self::Float,
                _ => return Self::Text,
            };
        }
        kind
    }

    /// Infer from raw cell texts, skipping the ones already judged missing.
    fn infer<'a>(cells: impl Iterator<Item = &'a str>) -> Self {
        let mut present = cells.filter(|c| !c.is_empty()).peekable();
        if present.peek().is_none() {
            return Self::Empty;
        }
        let present: Vec<&str> = present.collect();
        if present.iter().all(|c| parse_int(c.trim()).is_some()) {
            Self::Int
        } else if present.iter().all(|c| parse_float(c.trim()).is_some()) {
            Self::Float
        } else if present.iter().all(|c| parse_date(c.trim()).is_some()) {
            Self::Date
        } else {
            Self::Text
        }
    }

    fn convert(self, cell: &str) -> Value {
        if cell.is_empty() {
            return Value::Missing;
        }
        let trimmed = cell.trim();
        let typed = match self {
            Self::Int => parse_int(trimmed).map(Value::Int),
            Self::Float => parse_float(trimmed).map(Value::Float),
            Self::Date => parse_date(trimmed).map(Value::Date),
            Self::Text | Self::Empty => None,
        };
        typed.unwrap_or_else(|| Value::Text(cell.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// An immutable, ordered set of rows over fixed columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build from already-typed rows; column types are derived from the values.
    ///
    /// Every row must have one value per column.
    pub fn from_values(
        name: impl Into<String>,
        column_names: Vec<String>,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == column_names.len()));
        let columns = column_names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Column {
                kind: ColumnType::of_values(rows.iter().map(|r| &r[i])),
                name,
            })
            .collect();
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    /// Convenience for tests and in-memory sources.
    pub fn from_rows(name: &str, column_names: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self::from_values(
            name,
            column_names.iter().map(|c| c.to_string()).collect(),
            rows,
        )
    }

    /// Build from raw CSV cells, inferring one type per column.
    ///
    /// Cells listed in `na_values` become [`Value::Missing`].
    pub fn from_text(
        name: impl Into<String>,
        headers: Vec<String>,
        records: Vec<Vec<String>>,
        na_values: &[String],
    ) -> Self {
        let records: Vec<Vec<String>> = records
            .into_iter()
            .map(|record| {
                record
                    .into_iter()
                    .map(|cell| {
                        if na_values.iter().any(|na| na == cell.trim()) {
                            String::new()
                        } else {
                            cell
                        }
                    })
                    .collect()
            })
            .collect();

        let kinds: Vec<ColumnType> = (0..headers.len())
            .map(|i| ColumnType::infer(records.iter().map(move |r| r[i].as_str())))
            .collect();

        let rows = records
            .iter()
            .map(|record| {
                record
                    .iter()
                    .zip(&kinds)
                    .map(|(cell, kind)| kind.convert(cell))
                    .collect()
            })
            .collect();

        Self {
            name: name.into(),
            columns: headers
                .into_iter()
                .zip(kinds)
                .map(|(name, kind)| Column { name, kind })
                .collect(),
            rows,
        }
    }

    /// Same columns, different rows (filters, samples).
    pub(crate) fn with_rows(&self, rows: Vec<Vec<Value>>) -> Self {
        Self {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Column index or an `UnknownColumn` error listing the real columns.
    pub fn require_column(&self, name: &str) -> Result<usize, TableError> {
        self.column_index(name)
            .ok_or_else(|| TableError::UnknownColumn {
                table: self.name.clone(),
                column: name.to_string(),
                available: self.column_names(),
            })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|values| Row {
            columns: &self.columns,
            values,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        self.rows.iter().map(move |values| Row {
            columns: &self.columns,
            values,
        })
    }

    pub(crate) fn raw_rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Values of one column, top to bottom.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |r| &r[index])
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Table {
        self.with_rows(self.rows.iter().take(n).cloned().collect())
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Table {
        self.name = name.into();
        self
    }
}

impl Serialize for Table {
    /// Serialized as an array of objects, keys in column order.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in self.rows() {
            seq.serialize_element(&row)?;
        }
        seq.end()
    }
}

// ---------------------------------------------------------------------------
// Row view
// ---------------------------------------------------------------------------

/// Borrowed view of one row as a column → value mapping.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [Column],
    values: &'a [Value],
}

impl<'a> Row<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c.name == column)
            .map(|i| &self.values[i])
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        self.columns
            .iter()
            .map(|c| c.name.as_str())
            .zip(self.values.iter())
    }
}

impl Serialize for Row<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
