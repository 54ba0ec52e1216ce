use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::Serialize;

use crate::config::TableConfig;
use crate::error::TableError;
use crate::query::concat_tables;
use crate::source::{CsvSource, TableSource};
use crate::table::Table;

/// Rows included in [`TableInfo::sample`].
pub const SAMPLE_ROWS: usize = 3;

// ---------------------------------------------------------------------------
// Registry entries
// ---------------------------------------------------------------------------

enum Backing {
    Source(Box<dyn TableSource>),
    Union {
        members: Vec<String>,
        tag_column: Option<String>,
    },
}

struct Entry {
    config: TableConfig,
    backing: Backing,
    /// Filled by the first successful load; concurrent first callers block
    /// on the cell until that load finishes.
    table: OnceCell<Arc<Table>>,
}

impl Entry {
    fn new(config: TableConfig, backing: Backing) -> Self {
        Self {
            config,
            backing,
            table: OnceCell::new(),
        }
    }

    fn fresh_copy(&self) -> Option<Self> {
        match &self.backing {
            Backing::Union {
                members,
                tag_column,
            } => Some(Self::new(
                self.config.clone(),
                Backing::Union {
                    members: members.clone(),
                    tag_column: tag_column.clone(),
                },
            )),
            Backing::Source(_) => None,
        }
    }

    fn depends_on(&self, name: &str) -> bool {
        matches!(&self.backing, Backing::Union { members, .. } if members.iter().any(|m| m == name))
    }
}

#[derive(Default)]
struct Registry {
    order: Vec<String>,
    entries: HashMap<String, Arc<Entry>>,
}

impl Registry {
    fn lookup(&self, name: &str) -> Result<Arc<Entry>, TableError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| TableError::UnknownTable {
                name: name.to_string(),
                registered: self.order.clone(),
            })
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Registry of named tables, each parsed at most once per process.
///
/// Constructed by the entry point and passed by reference; there is no
/// global instance. All methods take `&self`, so one store can be shared
/// across threads behind an `Arc`.
pub struct TableStore {
    data_dir: PathBuf,
    registry: RwLock<Registry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub description: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub key_columns: Vec<String>,
    pub sample: Table,
}

impl TableStore {
    /// New empty store; relative `file` paths resolve against `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            registry: RwLock::new(Registry::default()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Register a table. Lazy: the backing file is not touched until the
    /// first [`get_table`](Self::get_table).
    pub fn register(&self, config: TableConfig) -> Result<(), TableError> {
        let backing = self.backing_for(&config)?;
        self.insert(config, backing, false)
    }

    /// Register a table backed by a custom source.
    pub fn register_source(
        &self,
        config: TableConfig,
        source: impl TableSource + 'static,
    ) -> Result<(), TableError> {
        if config.name.trim().is_empty() {
            return Err(TableError::invalid_config(&config.name, "name must not be empty"));
        }
        self.insert(config, Backing::Source(Box::new(source)), false)
    }

    /// Register or re-register a table, replacing any previous entry whole.
    ///
    /// Cached data for the old entry is dropped, and unions built on it are
    /// reset so they reload from the new member.
    pub fn replace(&self, config: TableConfig) -> Result<(), TableError> {
        let backing = self.backing_for(&config)?;
        self.insert(config, backing, true)
    }

    fn backing_for(&self, config: &TableConfig) -> Result<Backing, TableError> {
        config.validate()?;

        if let Some(members) = &config.union {
            let registry = self.registry.read();
            for member in members {
                if member == &config.name {
                    return Err(TableError::invalid_config(
                        &config.name,
                        "a union cannot include itself",
                    ));
                }
                let entry = registry.lookup(member)?;
                if entry.config.is_union() {
                    return Err(TableError::invalid_config(
                        &config.name,
                        format!("union member '{member}' is itself a union"),
                    ));
                }
            }
            return Ok(Backing::Union {
                members: members.clone(),
                tag_column: config.tag_column.clone(),
            });
        }

        // validate() guarantees exactly one of file/union.
        let file = config.file.as_deref().unwrap_or_default();
        let path = self.data_dir.join(file);
        Ok(Backing::Source(Box::new(CsvSource::new(
            path,
            config.format.clone(),
        ))))
    }

    fn insert(&self, config: TableConfig, backing: Backing, replace: bool) -> Result<(), TableError> {
        let name = config.name.clone();
        let mut registry = self.registry.write();

        if registry.entries.contains_key(&name) {
            if !replace {
                return Err(TableError::DuplicateName(name));
            }
            if config.is_union() && registry.entries.values().any(|e| e.depends_on(&name)) {
                return Err(TableError::invalid_config(
                    &name,
                    "cannot turn a union member into a union",
                ));
            }
        } else {
            registry.order.push(name.clone());
        }

        log::debug!("registered table '{}' ({})", name, describe(&backing));
        registry
            .entries
            .insert(name.clone(), Arc::new(Entry::new(config, backing)));

        if replace {
            let dependents: Vec<(String, Entry)> = registry
                .entries
                .iter()
                .filter(|(_, e)| e.depends_on(&name))
                .filter_map(|(n, e)| e.fresh_copy().map(|fresh| (n.clone(), fresh)))
                .collect();
            for (dependent, fresh) in dependents {
                log::debug!("reset union '{}' after '{}' was replaced", dependent, name);
                registry.entries.insert(dependent, Arc::new(fresh));
            }
        }
        Ok(())
    }

    /// Loaded table for `name`, parsing it on first access.
    ///
    /// Every later call returns the same `Arc`. A failed load is not cached;
    /// the next call tries again.
    pub fn get_table(&self, name: &str) -> Result<Arc<Table>, TableError> {
        // Clone the entry out so the registry lock is not held during I/O.
        let entry = self.registry.read().lookup(name)?;
        if let Some(table) = entry.table.get() {
            log::debug!("table '{}' served from cache", name);
            return Ok(Arc::clone(table));
        }
        entry
            .table
            .get_or_try_init(|| self.load_entry(name, &entry).map(Arc::new))
            .map(Arc::clone)
    }

    fn load_entry(&self, name: &str, entry: &Entry) -> Result<Table, TableError> {
        match &entry.backing {
            Backing::Source(source) => source.load(name),
            Backing::Union {
                members,
                tag_column,
            } => {
                let mut loaded = Vec::with_capacity(members.len());
                for member in members {
                    loaded.push((member.clone(), self.get_table(member)?));
                }
                let parts: Vec<(&str, &Table)> = loaded
                    .iter()
                    .map(|(member, table)| (member.as_str(), table.as_ref()))
                    .collect();
                let table = concat_tables(name, &parts, tag_column.as_deref())?;
                log::info!(
                    "built union '{}' from {} ({} rows)",
                    name,
                    members.join(", "),
                    table.len()
                );
                Ok(table)
            }
        }
    }

    /// Registered names in registration order. No I/O.
    pub fn list_tables(&self) -> Vec<String> {
        self.registry.read().order.clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.read().entries.contains_key(name)
    }

    pub fn config(&self, name: &str) -> Result<TableConfig, TableError> {
        Ok(self.registry.read().lookup(name)?.config.clone())
    }

    /// Whether the table has been parsed already. Unknown names are not loaded.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.registry
            .read()
            .entries
            .get(name)
            .map_or(false, |e| e.table.get().is_some())
    }

    /// Fail with `UnknownTable` unless every name is registered. No I/O.
    pub fn ensure_registered<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), TableError> {
        let registry = self.registry.read();
        for name in names {
            registry.lookup(name)?;
        }
        Ok(())
    }

    /// Eagerly load every registered table, stopping at the first failure.
    pub fn load_all(&self) -> Result<(), TableError> {
        for name in self.list_tables() {
            self.get_table(&name)?;
        }
        Ok(())
    }

    /// Description, shape and a small sample of one table. Loads it.
    pub fn table_info(&self, name: &str) -> Result<TableInfo, TableError> {
        let config = self.config(name)?;
        let table = self.get_table(name)?;
        Ok(TableInfo {
            name: config.name,
            description: config.description,
            rows: table.len(),
            columns: table.column_names(),
            key_columns: config.key_columns,
            sample: table.head(SAMPLE_ROWS),
        })
    }
}

fn describe(backing: &Backing) -> String {
    match backing {
        Backing::Source(source) => source.location(),
        Backing::Union { members, .. } => format!("union of {}", members.join(", ")),
    }
}
