use std::path::PathBuf;

use casco_intent::IntentError;
use casco_tables::TableError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read catalog {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid catalog TOML: {0}")]
    Parse(String),

    #[error("invalid catalog: {0}")]
    Validation(String),

    #[error("no catalog found (looked in: {})", join_paths(searched))]
    NotFound { searched: Vec<PathBuf> },

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Intent(#[from] IntentError),
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
