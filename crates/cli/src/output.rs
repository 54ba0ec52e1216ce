// stdout rendering: plain text for people, one JSON value for scripts

use std::io::{self, Write};

use serde::Serialize;

use casco_context::render_text_table;
use casco_tables::Table;

use crate::exit_codes::EXIT_ERROR;
use crate::CliError;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CliError {
        code: EXIT_ERROR,
        message: format!("cannot serialize output: {e}"),
        hint: None,
    })?;
    write_stdout(&format!("{text}\n"))
}

pub fn print_text(text: &str) -> Result<(), CliError> {
    if text.ends_with('\n') {
        write_stdout(text)
    } else {
        write_stdout(&format!("{text}\n"))
    }
}

/// A table as JSON rows, or as an aligned text table with a row count.
pub fn print_table(table: &Table, json: bool) -> Result<(), CliError> {
    if json {
        return print_json(table);
    }
    let mut text = render_text_table(table, &[]);
    let noun = if table.len() == 1 { "row" } else { "rows" };
    text.push_str(&format!("({} {})\n", table.len(), noun));
    write_stdout(&text)
}

fn write_stdout(text: &str) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    out.write_all(text.as_bytes())
        .and_then(|_| out.flush())
        .map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("cannot write output: {e}"),
            hint: None,
        })
}
