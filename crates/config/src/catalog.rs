use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use casco_context::ContextConfig;
use casco_intent::{EntityVocabulary, IntentExtractor, TopicRule, TriggerRule};
use casco_tables::{TableConfig, TableStore};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// File layout
// ---------------------------------------------------------------------------

/// Everything the assistant needs to know about its data, in one TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    /// Root for relative table files. Relative to the catalog file itself
    /// once loaded with [`Catalog::load`].
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub tables: Vec<TableConfig>,
    #[serde(default)]
    pub intent: IntentSection,
    #[serde(default)]
    pub context: ContextConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntentSection {
    pub tables: Vec<TriggerRule>,
    pub topics: Vec<TopicRule>,
    pub entities: Vec<EntitySource>,
}

/// An entity whose vocabulary is the distinct values of a table column.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntitySource {
    pub name: String,
    pub table: String,
    pub column: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Catalog {
    /// Parse and validate a catalog. `data_dir` is left as written.
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let catalog: Catalog =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Read a catalog file; a relative `data_dir` resolves against the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut catalog = Self::from_toml(&text)?;
        if catalog.data_dir.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            catalog.data_dir = base.join(&catalog.data_dir);
        }
        log::debug!(
            "catalog {}: {} tables, data in {}",
            path.display(),
            catalog.tables.len(),
            catalog.data_dir.display()
        );
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut file_tables: HashSet<&str> = HashSet::new();

        for table in &self.tables {
            table.validate()?;
            if !seen.insert(table.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "table '{}' is declared twice",
                    table.name
                )));
            }
            match &table.union {
                Some(members) => {
                    for member in members {
                        if !file_tables.contains(member.as_str()) {
                            return Err(ConfigError::Validation(format!(
                                "union '{}': member '{}' must be a file table declared before it",
                                table.name, member
                            )));
                        }
                    }
                }
                None => {
                    file_tables.insert(table.name.as_str());
                }
            }
        }

        for rule in &self.intent.tables {
            if !seen.contains(rule.table.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "intent rule names unknown table '{}'",
                    rule.table
                )));
            }
        }
        for entity in &self.intent.entities {
            if !seen.contains(entity.table.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "entity '{}' names unknown table '{}'",
                    entity.name, entity.table
                )));
            }
        }
        if let Some(temporal) = &self.context.temporal {
            for period in [&temporal.before, &temporal.after] {
                if !seen.contains(period.as_str()) {
                    return Err(ConfigError::Validation(format!(
                        "context.temporal names unknown table '{period}'"
                    )));
                }
            }
        }
        Ok(())
    }

    /// A store with every table registered, nothing loaded yet.
    pub fn build_store(&self) -> Result<TableStore, ConfigError> {
        let store = TableStore::new(&self.data_dir);
        for table in &self.tables {
            store.register(table.clone())?;
        }
        Ok(store)
    }

    /// Extractor over the catalog's rules. Entity vocabularies are read from
    /// the store, which loads their tables.
    pub fn build_extractor(&self, store: &TableStore) -> Result<IntentExtractor, ConfigError> {
        let mut extractor = IntentExtractor::with_rules(self.intent.tables.iter().cloned())?;
        for topic in &self.intent.topics {
            extractor.add_topic(topic.clone())?;
        }
        for entity in &self.intent.entities {
            let vocabulary =
                EntityVocabulary::from_store(store, &entity.name, &entity.table, &entity.column)?;
            extractor.add_vocabulary(vocabulary);
        }
        Ok(extractor)
    }
}
