//! Brazilian number formatting and plain-text table rendering.

use casco_tables::Table;

/// Money in Brazilian reais: `R$ 1.234,56`.
pub fn format_currency(value: f64) -> String {
    format!("R$ {}", group_decimal(value, 2))
}

/// Percentage with a decimal comma: `15,50%`.
///
/// Values with magnitude up to 1 are taken as fractions (`0.155` → `15,50%`),
/// larger ones as percentages already.
pub fn format_percentage(value: f64, decimals: usize) -> String {
    let pct = if value.abs() > 1.0 { value } else { value * 100.0 };
    format!("{}%", format!("{pct:.decimals$}").replace('.', ","))
}

/// Signed change given in percent units: `+4,98%`, `-12,50%`, `+250,00%`.
pub fn format_variation(pct: f64) -> String {
    let sign = if pct >= 0.0 { "+" } else { "" };
    // Up to a full swing the fraction form keeps `format_percentage` scaling.
    let value = if pct.abs() > 100.0 { pct } else { pct / 100.0 };
    format!("{sign}{}", format_percentage(value, 2))
}

/// `1234567.891` → `1.234.567,89` for two decimals.
fn group_decimal(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*c);
    }

    let negative = value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
    let sign = if negative { "-" } else { "" };
    match frac_part {
        Some(frac) => format!("{sign}{grouped},{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Left-aligned text table over `columns` (all columns when empty), one
/// line per row, cells separated by two spaces. Missing cells are blank.
pub fn render_text_table(table: &Table, columns: &[String]) -> String {
    let indices: Vec<usize> = if columns.is_empty() {
        (0..table.columns().len()).collect()
    } else {
        columns.iter().filter_map(|c| table.column_index(c)).collect()
    };

    let mut lines: Vec<Vec<String>> = Vec::with_capacity(table.len() + 1);
    lines.push(
        indices
            .iter()
            .map(|&i| table.columns()[i].name.clone())
            .collect(),
    );
    for row in table.rows() {
        let values = row.values();
        lines.push(indices.iter().map(|&i| values[i].to_string()).collect());
    }

    let mut widths = vec![0usize; indices.len()];
    for line in &lines {
        for (w, cell) in widths.iter_mut().zip(line) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for line in &lines {
        let mut text = String::new();
        for (i, (cell, width)) in line.iter().zip(&widths).enumerate() {
            if i > 0 {
                text.push_str("  ");
            }
            text.push_str(cell);
            let pad = width - cell.chars().count();
            text.extend(std::iter::repeat(' ').take(pad));
        }
        out.push_str(text.trim_end());
        out.push('\n');
    }
    out
}
