use serde::Serialize;

use casco_config::{discover, Catalog};
use casco_context::{tables_summary, ContextBuilder, Turn};
use casco_intent::Intent;
use casco_tables::{Collision, Filter, Predicate, TableError, TableStore, Trend, Value};

use crate::output::{print_json, print_table, print_text};
use crate::{CliError, Cli, Commands};

/// Name given to the result of `casco concat`.
const CONCAT_NAME: &str = "concat";

pub fn run(cli: &Cli) -> Result<(), CliError> {
    let catalog = open_catalog(cli)?;
    let store = catalog.build_store()?;

    match &cli.command {
        Commands::Tables => cmd_tables(&store, cli.json),
        Commands::Info { table } => cmd_info(&store, table, cli.json),
        Commands::Summary => print_text(&tables_summary(&store)),
        Commands::Query { table, r#where } => {
            let filter = parse_where(r#where)?;
            print_table(&store.filter(table, &filter)?, cli.json)
        }
        Commands::Merge {
            left,
            right,
            on,
            how,
            suffix_names,
        } => {
            let collision = if *suffix_names {
                Collision::SuffixTableName
            } else {
                Collision::Reject
            };
            let merged = store
                .merge_with(left, right, on, *how, collision)
                .map_err(|err| merge_error(err, *suffix_names))?;
            print_table(&merged, cli.json)
        }
        Commands::Unique { table, column } => cmd_unique(&store, table, column, cli.json),
        Commands::Concat { tables, tag } => {
            let names: Vec<&str> = tables.iter().map(String::as_str).collect();
            let stacked = store.concat(CONCAT_NAME, &names, tag.as_deref())?;
            print_table(&stacked, cli.json)
        }
        Commands::Compare {
            metric,
            by,
            left,
            right,
            top,
            declining,
        } => {
            let group_by: Vec<&str> = by.iter().map(String::as_str).collect();
            let comparison = match top {
                Some(limit) => {
                    let trend = if *declining { Trend::Declining } else { Trend::Growing };
                    store.top_changes(metric, &group_by, left, right, trend, *limit)?
                }
                None => store.compare(metric, &group_by, left, right)?,
            };
            print_table(&comparison, cli.json)
        }
        Commands::Mean { table, metric, by } => {
            let group_by: Vec<&str> = by.iter().map(String::as_str).collect();
            print_table(&store.group_mean(table, &group_by, metric)?, cli.json)
        }
        Commands::Stats { table, column } => cmd_stats(&store, table, column, cli.json),
        Commands::Intent { text } => {
            let extractor = catalog.build_extractor(&store)?;
            let intent = extractor.analyze(text);
            if cli.json {
                print_json(&intent)
            } else {
                print_text(&describe_intent(&intent))
            }
        }
        Commands::Context { text, history } => {
            let turns = parse_history(history)?;
            let extractor = catalog.build_extractor(&store)?;
            let builder = ContextBuilder::new(&store, &extractor, catalog.context.clone());
            let prompt = builder.build_prompt(text, &turns)?;
            if cli.json {
                #[derive(Serialize)]
                struct ContextOutput<'a> {
                    intent: Intent,
                    prompt: &'a str,
                }
                print_json(&ContextOutput {
                    intent: extractor.analyze(text),
                    prompt: &prompt,
                })
            } else {
                print_text(&prompt)
            }
        }
    }
}

fn open_catalog(cli: &Cli) -> Result<Catalog, CliError> {
    let path = discover(cli.catalog.as_deref())?;
    log::debug!("using catalog {}", path.display());
    Ok(Catalog::load(&path)?)
}

// ============================================================================
// tables / info / unique / stats
// ============================================================================

#[derive(Serialize)]
struct TableListing {
    name: String,
    description: String,
    kind: &'static str,
    key_columns: Vec<String>,
    loaded: bool,
}

fn cmd_tables(store: &TableStore, json: bool) -> Result<(), CliError> {
    let mut listing = Vec::new();
    for name in store.list_tables() {
        let config = store.config(&name)?;
        listing.push(TableListing {
            kind: if config.is_union() { "union" } else { "file" },
            loaded: store.is_loaded(&name),
            name,
            description: config.description,
            key_columns: config.key_columns,
        });
    }

    if json {
        return print_json(&listing);
    }
    let width = listing.iter().map(|t| t.name.len()).max().unwrap_or(0);
    let mut text = String::new();
    for table in &listing {
        text.push_str(&format!("{:<width$}  {}\n", table.name, table.description));
    }
    print_text(&text)
}

fn cmd_info(store: &TableStore, table: &str, json: bool) -> Result<(), CliError> {
    let info = store.table_info(table)?;
    if json {
        return print_json(&info);
    }

    let mut text = format!("{}\n", info.name);
    if !info.description.is_empty() {
        text.push_str(&format!("  description: {}\n", info.description));
    }
    text.push_str(&format!("  rows:        {}\n", info.rows));
    text.push_str(&format!("  columns:     {}\n", info.columns.join(", ")));
    if !info.key_columns.is_empty() {
        text.push_str(&format!("  key columns: {}\n", info.key_columns.join(", ")));
    }
    text.push('\n');
    text.push_str(&casco_context::render_text_table(&info.sample, &[]));
    print_text(&text)
}

fn cmd_unique(store: &TableStore, table: &str, column: &str, json: bool) -> Result<(), CliError> {
    let values = store.unique_values(table, column)?;
    if json {
        return print_json(&values);
    }
    let text: String = values.iter().map(|v| format!("{v}\n")).collect();
    print_text(&text)
}

fn cmd_stats(store: &TableStore, table: &str, column: &str, json: bool) -> Result<(), CliError> {
    let stats = store.column_stats(table, column)?;
    if json {
        return print_json(&stats);
    }
    match stats {
        Some(s) => print_text(&format!(
            "count={} mean={:.2} min={:.2} max={:.2}",
            s.count, s.mean, s.min, s.max
        )),
        None => print_text("no numeric values"),
    }
}

fn merge_error(err: TableError, suffixed: bool) -> CliError {
    let ambiguous = matches!(err, TableError::AmbiguousColumn { .. });
    let cli_err = CliError::from(err);
    match (ambiguous, suffixed) {
        (true, false) => cli_err.with_hint("pass --suffix-names to keep both columns"),
        (true, true) => cli_err.with_hint("a renamed column meets an existing one; rename it in the CSV header"),
        _ => cli_err,
    }
}

fn describe_intent(intent: &Intent) -> String {
    let mut text = format!("tables:   {}\n", intent.tables.join(", "));
    text.push_str(&format!("topic:    {}\n", intent.topic));
    let entities: Vec<String> = intent
        .entities
        .iter()
        .map(|e| format!("{}={}", e.name, e.value))
        .collect();
    text.push_str(&format!("entities: {}\n", entities.join(", ")));
    text
}

// ============================================================================
// Argument parsing
// ============================================================================

/// `COLUMN=VALUE` or `COLUMN=V1|V2|...` clauses into one filter.
fn parse_where(clauses: &[String]) -> Result<Filter, CliError> {
    let mut filter = Filter::new();
    for clause in clauses {
        let (column, values) = clause
            .split_once('=')
            .filter(|(column, _)| !column.trim().is_empty())
            .ok_or_else(|| {
                CliError::usage(format!("invalid --where '{clause}'"))
                    .with_hint("expected COLUMN=VALUE or COLUMN=V1|V2")
            })?;
        let mut accepted: Vec<Value> = values.split('|').map(Value::from).collect();
        let predicate = if accepted.len() == 1 {
            Predicate::Equals(accepted.remove(0))
        } else {
            Predicate::OneOf(accepted)
        };
        filter.push(column.trim(), predicate);
    }
    Ok(filter)
}

fn parse_history(entries: &[String]) -> Result<Vec<Turn>, CliError> {
    entries
        .iter()
        .map(|entry| {
            entry
                .split_once(':')
                .map(|(role, content)| Turn::new(role.trim(), content.trim()))
                .ok_or_else(|| CliError::usage(format!("invalid --history '{entry}' (expected ROLE:CONTENT)")))
        })
        .collect()
}
