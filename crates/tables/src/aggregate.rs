use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::TableError;
use crate::query::{duplicates, side_tags};
use crate::store::TableStore;
use crate::table::Table;
use crate::value::Value;

pub const DELTA_ABS: &str = "delta_abs";
pub const DELTA_PCT: &str = "delta_pct";

/// Summary of the numeric cells of one column. Missing cells are skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

fn require_numeric(table: &Table, column: &str) -> Result<usize, TableError> {
    let index = table.require_column(column)?;
    if !table.columns()[index].kind.is_numeric() {
        return Err(TableError::NotNumeric {
            table: table.name().to_string(),
            column: column.to_string(),
        });
    }
    Ok(index)
}

/// Count/mean/min/max of a numeric column; `None` when every cell is missing.
pub fn column_stats(table: &Table, column: &str) -> Result<Option<ColumnStats>, TableError> {
    let index = require_numeric(table, column)?;
    let numbers: Vec<f64> = table.column_values(index).filter_map(Value::as_f64).collect();
    if numbers.is_empty() {
        return Ok(None);
    }
    let sum: f64 = numbers.iter().sum();
    Ok(Some(ColumnStats {
        count: numbers.len(),
        mean: sum / numbers.len() as f64,
        min: numbers.iter().copied().fold(f64::INFINITY, f64::min),
        max: numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }))
}

/// Group keys in first-seen order with the running (sum, count) of `metric`.
///
/// Rows with a missing group key are dropped.
fn grouped_sums(
    table: &Table,
    group_by: &[&str],
    metric: &str,
) -> Result<Vec<(Vec<Value>, f64, usize)>, TableError> {
    let keys: Vec<usize> = group_by
        .iter()
        .map(|c| table.require_column(c))
        .collect::<Result<_, _>>()?;
    let metric_index = require_numeric(table, metric)?;

    let mut order: Vec<(Vec<Value>, f64, usize)> = Vec::new();
    let mut positions: HashMap<Vec<Value>, usize> = HashMap::new();

    for row in table.rows() {
        let values = row.values();
        let key: Vec<Value> = keys.iter().map(|&i| values[i].clone()).collect();
        if key.iter().any(Value::is_missing) {
            continue;
        }
        let slot = *positions.entry(key.clone()).or_insert_with(|| {
            order.push((key, 0.0, 0));
            order.len() - 1
        });
        if let Some(x) = values[metric_index].as_f64() {
            order[slot].1 += x;
            order[slot].2 += 1;
        }
    }
    Ok(order)
}

fn mean_value(sum: f64, count: usize) -> Value {
    if count == 0 {
        Value::Missing
    } else {
        Value::Float(sum / count as f64)
    }
}

/// Mean of `metric` per distinct combination of `group_by` columns.
///
/// Output columns: the group columns, then `metric`. A group whose metric
/// cells are all missing gets a missing mean.
pub fn group_mean(table: &Table, group_by: &[&str], metric: &str) -> Result<Table, TableError> {
    let groups = grouped_sums(table, group_by, metric)?;
    let rows = groups
        .into_iter()
        .map(|(mut key, sum, count)| {
            key.push(mean_value(sum, count));
            key
        })
        .collect();

    let mut names: Vec<String> = group_by.iter().map(|c| c.to_string()).collect();
    names.push(metric.to_string());
    Ok(Table::from_values(format!("{}_mean", table.name()), names, rows))
}

/// Compare the per-group mean of `metric` between two tables.
///
/// Groups from `left` come first in their order, then groups only `right`
/// has. Columns: group columns, `<metric>_<left>`, `<metric>_<right>`
/// (`<metric>_left`/`<metric>_right` when both tables share a name),
/// `delta_abs` (right - left) and `delta_pct` (relative to left, two
/// decimals; missing when the left mean is zero or missing).
pub fn compare_tables(
    left: &Table,
    right: &Table,
    group_by: &[&str],
    metric: &str,
) -> Result<Table, TableError> {
    let left_groups = grouped_sums(left, group_by, metric)?;
    let right_groups = grouped_sums(right, group_by, metric)?;

    let right_means: HashMap<&Vec<Value>, Value> = right_groups
        .iter()
        .map(|(key, sum, count)| (key, mean_value(*sum, *count)))
        .collect();

    let mut rows = Vec::new();
    for (key, sum, count) in &left_groups {
        let before = mean_value(*sum, *count);
        let after = right_means.get(key).cloned().unwrap_or(Value::Missing);
        rows.push(comparison_row(key, before, after));
    }
    let left_keys: std::collections::HashSet<&Vec<Value>> =
        left_groups.iter().map(|(key, _, _)| key).collect();
    for (key, sum, count) in &right_groups {
        if !left_keys.contains(key) {
            rows.push(comparison_row(key, Value::Missing, mean_value(*sum, *count)));
        }
    }

    let (left_tag, right_tag) = side_tags(left.name(), right.name());
    let mut names: Vec<String> = group_by.iter().map(|c| c.to_string()).collect();
    names.push(format!("{metric}_{left_tag}"));
    names.push(format!("{metric}_{right_tag}"));
    names.push(DELTA_ABS.to_string());
    names.push(DELTA_PCT.to_string());
    let repeated = duplicates(&names);
    if !repeated.is_empty() {
        return Err(TableError::AmbiguousColumn {
            left: left.name().to_string(),
            right: right.name().to_string(),
            columns: repeated,
        });
    }

    Ok(Table::from_values(
        format!("{}_vs_{}", left.name(), right.name()),
        names,
        rows,
    ))
}

/// Which end of a comparison a ranking keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Largest `delta_pct` first.
    #[default]
    Growing,
    /// Smallest (most negative) `delta_pct` first.
    Declining,
}

/// The `limit` rows of a [`compare_tables`] result with the strongest change
/// in `trend`'s direction. Rows without a `delta_pct` (groups one side lacks,
/// or a zero baseline) are left out; ties keep comparison order.
pub fn top_changes(comparison: &Table, trend: Trend, limit: usize) -> Result<Table, TableError> {
    let pct = comparison.require_column(DELTA_PCT)?;
    let mut ranked: Vec<(f64, &Vec<Value>)> = comparison
        .raw_rows()
        .iter()
        .filter_map(|row| row[pct].as_f64().map(|p| (p, row)))
        .collect();
    ranked.sort_by(|a, b| match trend {
        Trend::Growing => b.0.total_cmp(&a.0),
        Trend::Declining => a.0.total_cmp(&b.0),
    });

    let rows = ranked
        .into_iter()
        .take(limit)
        .map(|(_, row)| row.clone())
        .collect();
    Ok(Table::from_values(
        format!("{}_top", comparison.name()),
        comparison.column_names(),
        rows,
    ))
}

fn comparison_row(key: &[Value], before: Value, after: Value) -> Vec<Value> {
    let (delta_abs, delta_pct) = match (before.as_f64(), after.as_f64()) {
        (Some(b), Some(a)) => {
            let delta = a - b;
            let pct = if b != 0.0 {
                Value::Float(((delta / b) * 100.0 * 100.0).round() / 100.0)
            } else {
                Value::Missing
            };
            (Value::Float(delta), pct)
        }
        _ => (Value::Missing, Value::Missing),
    };
    let mut row = key.to_vec();
    row.extend([before, after, delta_abs, delta_pct]);
    row
}

impl TableStore {
    pub fn column_stats(&self, table: &str, column: &str) -> Result<Option<ColumnStats>, TableError> {
        column_stats(&*self.get_table(table)?, column)
    }

    pub fn group_mean(&self, table: &str, group_by: &[&str], metric: &str) -> Result<Table, TableError> {
        group_mean(&*self.get_table(table)?, group_by, metric)
    }

    /// Period-over-period comparison of a metric between two registered tables.
    pub fn compare(
        &self,
        metric: &str,
        group_by: &[&str],
        left: &str,
        right: &str,
    ) -> Result<Table, TableError> {
        self.ensure_registered([left, right])?;
        let left_table = self.get_table(left)?;
        let right_table = self.get_table(right)?;
        compare_tables(&left_table, &right_table, group_by, metric)
    }

    /// [`TableStore::compare`] narrowed to the `limit` strongest movers.
    pub fn top_changes(
        &self,
        metric: &str,
        group_by: &[&str],
        left: &str,
        right: &str,
        trend: Trend,
        limit: usize,
    ) -> Result<Table, TableError> {
        top_changes(&self.compare(metric, group_by, left, right)?, trend, limit)
    }
}
