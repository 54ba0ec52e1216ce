//! Read-only relational operations over loaded tables.
//!
//! Each operation exists twice: a free function over `&Table` and a
//! `TableStore` method that resolves table names first. Results are new
//! tables; the store's cached tables are never modified.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TableError;
use crate::store::TableStore;
use crate::table::Table;
use crate::value::Value;

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Equals(Value),
    OneOf(Vec<Value>),
}

impl Predicate {
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Equals(expected) => value.matches(expected),
            Self::OneOf(accepted) => accepted.iter().any(|a| value.matches(a)),
        }
    }
}

/// Column → accepted value(s). Every predicate must hold for a row to pass.
///
/// An empty filter passes every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<(String, Predicate)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates
            .push((column.into(), Predicate::Equals(value.into())));
        self
    }

    pub fn one_of<V: Into<Value>>(
        mut self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.predicates.push((
            column.into(),
            Predicate::OneOf(values.into_iter().map(Into::into).collect()),
        ));
        self
    }

    pub fn push(&mut self, column: impl Into<String>, predicate: Predicate) {
        self.predicates.push((column.into(), predicate));
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.predicates.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Predicate)> {
        self.predicates.iter().map(|(c, p)| (c.as_str(), p))
    }
}

/// Rows of `table` passing every predicate, in their original order.
pub fn filter_table(table: &Table, filter: &Filter) -> Result<Table, TableError> {
    let mut resolved: Vec<(usize, &Predicate)> = Vec::new();
    for (column, predicate) in filter.iter() {
        resolved.push((table.require_column(column)?, predicate));
    }

    let rows = table
        .raw_rows()
        .iter()
        .filter(|row| resolved.iter().all(|(i, p)| p.accepts(&row[*i])))
        .cloned()
        .collect();
    Ok(table.with_rows(rows))
}

/// Distinct non-missing values of a column, in first-seen order.
pub fn unique_in(table: &Table, column: &str) -> Result<Vec<Value>, TableError> {
    let index = table.require_column(column)?;
    let mut seen = HashSet::new();
    Ok(table
        .column_values(index)
        .filter(|v| !v.is_missing())
        .filter(|v| seen.insert(*v))
        .cloned()
        .collect())
}

// ---------------------------------------------------------------------------
// Joins
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinHow {
    #[default]
    Inner,
    Left,
    Right,
    Outer,
}

impl fmt::Display for JoinHow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => write!(f, "inner"),
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
            Self::Outer => write!(f, "outer"),
        }
    }
}

impl FromStr for JoinHow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inner" => Ok(Self::Inner),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "outer" | "full" => Ok(Self::Outer),
            other => Err(format!(
                "unknown join '{other}' (expected inner, left, right or outer)"
            )),
        }
    }
}

/// What to do when both sides of a merge carry the same non-key column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collision {
    /// Fail with `AmbiguousColumn`.
    #[default]
    Reject,
    /// Rename each colliding column to `<column>_<table name>` on both sides,
    /// or `<column>_left`/`<column>_right` when the tables share a name.
    /// Still fails with `AmbiguousColumn` if a renamed column meets a column
    /// already carrying that name.
    SuffixTableName,
}

/// Join two tables on a column both have.
///
/// Output columns are the left columns in order followed by the right
/// columns other than `on`. Missing keys never match. Unmatched sides are
/// filled with [`Value::Missing`]; for right-only rows the key comes from
/// the right table.
pub fn merge_tables(
    left: &Table,
    right: &Table,
    on: &str,
    how: JoinHow,
    collision: Collision,
) -> Result<Table, TableError> {
    let left_key = left.require_column(on)?;
    let right_key = right.require_column(on)?;

    let right_names: Vec<String> = right.column_names();
    let clashes: Vec<String> = right_names
        .iter()
        .filter(|c| c.as_str() != on && left.has_column(c))
        .cloned()
        .collect();

    let (left_names, right_out_names) = match (clashes.is_empty(), collision) {
        (true, _) => (left.column_names(), without(&right_names, on)),
        (false, Collision::Reject) => {
            return Err(TableError::AmbiguousColumn {
                left: left.name().to_string(),
                right: right.name().to_string(),
                columns: clashes,
            })
        }
        (false, Collision::SuffixTableName) => {
            let (left_tag, right_tag) = side_tags(left.name(), right.name());
            (
                suffixed(&left.column_names(), &clashes, left_tag),
                suffixed(&without(&right_names, on), &clashes, right_tag),
            )
        }
    };

    // A renamed column can still land on a name one side already has.
    let repeated = duplicates(left_names.iter().chain(&right_out_names));
    if !repeated.is_empty() {
        return Err(TableError::AmbiguousColumn {
            left: left.name().to_string(),
            right: right.name().to_string(),
            columns: repeated,
        });
    }

    // Right rows grouped by key, preserving right order within each key.
    let mut index: HashMap<&Value, Vec<usize>> = HashMap::new();
    for (i, row) in right.raw_rows().iter().enumerate() {
        let key = &row[right_key];
        if !key.is_missing() {
            index.entry(key).or_default().push(i);
        }
    }

    let right_width = right.columns().len() - 1;
    let right_part = |row: &[Value]| -> Vec<Value> {
        row.iter()
            .enumerate()
            .filter(|(i, _)| *i != right_key)
            .map(|(_, v)| v.clone())
            .collect()
    };

    let mut rows = Vec::new();
    let mut right_matched = vec![false; right.len()];

    if how == JoinHow::Right {
        // Every right row in right order, left matches in left order.
        let mut left_index: HashMap<&Value, Vec<usize>> = HashMap::new();
        for (i, row) in left.raw_rows().iter().enumerate() {
            let key = &row[left_key];
            if !key.is_missing() {
                left_index.entry(key).or_default().push(i);
            }
        }
        for right_row in right.raw_rows() {
            let matches = left_index.get(&right_row[right_key]);
            match matches {
                Some(lefts) => {
                    for &li in lefts {
                        let mut out = left.raw_rows()[li].clone();
                        out.extend(right_part(right_row.as_slice()));
                        rows.push(out);
                    }
                }
                None => {
                    let mut out = vec![Value::Missing; left.columns().len()];
                    out[left_key] = right_row[right_key].clone();
                    out.extend(right_part(right_row.as_slice()));
                    rows.push(out);
                }
            }
        }
    } else {
        for left_row in left.raw_rows() {
            let key = &left_row[left_key];
            let matches = if key.is_missing() { None } else { index.get(key) };
            match matches {
                Some(rights) => {
                    for &ri in rights {
                        right_matched[ri] = true;
                        let mut out = left_row.clone();
                        out.extend(right_part(right.raw_rows()[ri].as_slice()));
                        rows.push(out);
                    }
                }
                None if how != JoinHow::Inner => {
                    let mut out = left_row.clone();
                    out.extend(std::iter::repeat(Value::Missing).take(right_width));
                    rows.push(out);
                }
                None => {}
            }
        }

        if how == JoinHow::Outer {
            for (ri, right_row) in right.raw_rows().iter().enumerate() {
                if right_matched[ri] {
                    continue;
                }
                let mut out = vec![Value::Missing; left.columns().len()];
                out[left_key] = right_row[right_key].clone();
                out.extend(right_part(right_row.as_slice()));
                rows.push(out);
            }
        }
    }

    let mut names = left_names;
    names.extend(right_out_names);
    Ok(Table::from_values(
        format!("{}+{}", left.name(), right.name()),
        names,
        rows,
    ))
}

fn without(names: &[String], skip: &str) -> Vec<String> {
    names.iter().filter(|n| n.as_str() != skip).cloned().collect()
}

/// Suffixes identifying the two sides of a merge or comparison: the table
/// names, or `left`/`right` when both sides have the same name.
pub(crate) fn side_tags<'a>(left: &'a str, right: &'a str) -> (&'a str, &'a str) {
    if left == right {
        ("left", "right")
    } else {
        (left, right)
    }
}

/// Names occurring more than once, each reported once in first-seen order.
pub(crate) fn duplicates<'a>(names: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut repeated: Vec<String> = Vec::new();
    for name in names {
        if !seen.insert(name.as_str()) && !repeated.contains(name) {
            repeated.push(name.clone());
        }
    }
    repeated
}

fn suffixed(names: &[String], clashes: &[String], table: &str) -> Vec<String> {
    names
        .iter()
        .map(|n| {
            if clashes.contains(n) {
                format!("{n}_{table}")
            } else {
                n.clone()
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Concatenation
// ---------------------------------------------------------------------------

/// Stack tables vertically.
///
/// Columns are the union of the parts' columns in first-seen order; cells a
/// part lacks are missing. With `tag_column`, each row also records the name
/// of the part it came from.
pub fn concat_tables(
    name: &str,
    parts: &[(&str, &Table)],
    tag_column: Option<&str>,
) -> Result<Table, TableError> {
    let mut names: Vec<String> = Vec::new();
    for (_, table) in parts {
        for column in table.column_names() {
            if !names.contains(&column) {
                names.push(column);
            }
        }
    }

    if let Some(tag) = tag_column {
        if names.iter().any(|n| n == tag) {
            return Err(TableError::invalid_config(
                name,
                format!("tag column '{tag}' already exists in a member table"),
            ));
        }
    }

    let mut rows = Vec::new();
    for (part_name, table) in parts {
        let positions: Vec<Option<usize>> = names.iter().map(|n| table.column_index(n)).collect();
        for row in table.raw_rows() {
            let mut out: Vec<Value> = positions
                .iter()
                .map(|p| p.map_or(Value::Missing, |i| row[i].clone()))
                .collect();
            if tag_column.is_some() {
                out.push(Value::from(*part_name));
            }
            rows.push(out);
        }
    }

    if let Some(tag) = tag_column {
        names.push(tag.to_string());
    }
    Ok(Table::from_values(name, names, rows))
}

// ---------------------------------------------------------------------------
// Store-level operations
// ---------------------------------------------------------------------------

impl TableStore {
    /// Rows of a registered table matching every predicate.
    pub fn filter(&self, table: &str, filter: &Filter) -> Result<Table, TableError> {
        filter_table(&*self.get_table(table)?, filter)
    }

    /// Join two registered tables, rejecting ambiguous column names.
    pub fn merge(&self, left: &str, right: &str, on: &str, how: JoinHow) -> Result<Table, TableError> {
        self.merge_with(left, right, on, how, Collision::Reject)
    }

    pub fn merge_with(
        &self,
        left: &str,
        right: &str,
        on: &str,
        how: JoinHow,
        collision: Collision,
    ) -> Result<Table, TableError> {
        self.ensure_registered([left, right])?;
        let left_table = self.get_table(left)?;
        let right_table = self.get_table(right)?;
        merge_tables(&left_table, &right_table, on, how, collision)
    }

    pub fn unique_values(&self, table: &str, column: &str) -> Result<Vec<Value>, TableError> {
        unique_in(&*self.get_table(table)?, column)
    }

    /// Filter several tables at once, all or nothing.
    ///
    /// Every name is checked before anything is loaded, so an unregistered
    /// table fails the call without partial results. Results follow request
    /// order.
    pub fn query_many<S: AsRef<str>>(
        &self,
        requests: &[(S, Filter)],
    ) -> Result<Vec<(String, Table)>, TableError> {
        self.ensure_registered(requests.iter().map(|(name, _)| name.as_ref()))?;
        requests
            .iter()
            .map(|(name, filter)| {
                let name = name.as_ref();
                Ok((name.to_string(), self.filter(name, filter)?))
            })
            .collect()
    }

    /// Concatenate registered tables under a new (unregistered) name.
    pub fn concat(&self, name: &str, tables: &[&str], tag_column: Option<&str>) -> Result<Table, TableError> {
        self.ensure_registered(tables.iter().copied())?;
        let loaded = tables
            .iter()
            .map(|t| self.get_table(t).map(|table| (*t, table)))
            .collect::<Result<Vec<_>, _>>()?;
        let parts: Vec<(&str, &Table)> = loaded.iter().map(|(n, t)| (*n, t.as_ref())).collect();
        concat_tables(name, &parts, tag_column)
    }
}
