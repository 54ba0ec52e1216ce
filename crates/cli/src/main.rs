// casco CLI - headless access to the table catalog, queries and intents

mod commands;
mod exit_codes;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use casco_config::ConfigError;
use casco_tables::{JoinHow, TableError};

use exit_codes::{config_exit_code, table_exit_code, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "casco")]
#[command(about = "Vehicle insurance tables: query, merge, compare and build LLM context")]
#[command(version)]
struct Cli {
    /// Catalog file (default: $CASCO_CATALOG, ./casco.toml, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    catalog: Option<PathBuf>,

    /// Print machine-readable JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Log debug details to stderr (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered tables in catalog order (no data is read)
    Tables,

    /// Describe one table: row count, columns, key columns and a sample
    Info { table: String },

    /// Markdown overview of every table, as given to the assistant
    Summary,

    /// Rows of a table matching every --where clause
    #[command(after_help = "\
Examples:
  casco query casco --where modelo=CIVIC
  casco query casco --where 'regiao_desc=SP|RJ' --where ano=2020")]
    Query {
        table: String,

        /// COLUMN=VALUE, or COLUMN=V1|V2 to accept any of several values. Repeatable.
        #[arg(long = "where", value_name = "COLUMN=VALUE")]
        r#where: Vec<String>,
    },

    /// Join two tables on a shared column
    Merge {
        left: String,
        right: String,

        /// Join column present in both tables
        #[arg(long)]
        on: String,

        /// inner, left, right or outer
        #[arg(long, default_value = "inner")]
        how: JoinHow,

        /// Rename columns present on both sides to <column>_<table> instead of failing
        #[arg(long)]
        suffix_names: bool,
    },

    /// Distinct non-missing values of a column, in first-seen order
    Unique { table: String, column: String },

    /// Stack tables vertically
    Concat {
        #[arg(required = true, num_args = 1..)]
        tables: Vec<String>,

        /// Add a column holding each row's source table
        #[arg(long, value_name = "COLUMN")]
        tag: Option<String>,
    },

    /// Compare a metric's group means between two tables
    #[command(after_help = "\
Examples:
  casco compare premio1 --by modelo casco_sem1 casco_sem2
  casco compare premio1 --by modelo,regiao_desc casco_sem1 casco_sem2
  casco compare premio1 --by modelo casco_sem1 casco_sem2 --top 10 --declining")]
    Compare {
        metric: String,

        /// Group columns, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        by: Vec<String>,

        left: String,
        right: String,

        /// Keep only the N groups with the largest growth in delta_pct
        #[arg(long, value_name = "N")]
        top: Option<usize>,

        /// With --top, rank by the largest decline instead
        #[arg(long, requires = "top")]
        declining: bool,
    },

    /// Mean of a numeric column per group
    #[command(after_help = "\
Examples:
  casco mean casco premio1 --by modelo
  casco mean casco premio1 --by modelo,periodo")]
    Mean {
        table: String,
        metric: String,

        /// Group columns, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        by: Vec<String>,
    },

    /// Count, mean, min and max of a numeric column
    Stats { table: String, column: String },

    /// Tables, topic and entities the assistant sees in a message
    Intent { text: String },

    /// The prompt the assistant would send for a message
    Context {
        text: String,

        /// Earlier turns as ROLE:CONTENT, oldest first. Repeatable.
        #[arg(long, value_name = "ROLE:CONTENT")]
        history: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = commands::run(&cli);

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError {
            code,
            message,
            hint,
        }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Logs go to stderr so `--json` stdout stays a single JSON value.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_USAGE,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<TableError> for CliError {
    fn from(err: TableError) -> Self {
        let hint = match &err {
            TableError::DataLoad { .. } => Some("check the file path and `[tables.format]` in the catalog".to_string()),
            _ => None,
        };
        Self {
            code: table_exit_code(&err),
            message: err.to_string(),
            hint,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        let hint = match &err {
            ConfigError::NotFound { .. } => Some(format!(
                "pass --catalog <path> or set {}",
                casco_config::CATALOG_ENV
            )),
            _ => None,
        };
        Self {
            code: config_exit_code(&err),
            message: err.to_string(),
            hint,
        }
    }
}
