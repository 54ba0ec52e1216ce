use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use casco_intent::{Intent, IntentExtractor};
use casco_tables::aggregate::{column_stats, compare_tables};
use casco_tables::query::filter_table;
use casco_tables::{Filter, Table, TableError, TableStore};

use crate::config::ContextConfig;
use crate::format::{format_currency, format_variation, render_text_table};

const PREAMBLE: &str = "Você é um assistente especializado em seguros automotivos.";

const INSTRUCTIONS: &str = "\
**Instruções:**
- Responda usando os dados acima sempre que possível
- Se os dados não bastarem, diga claramente o que falta
- Seja claro e objetivo
- Aponte tendências quando os dados mostrarem alguma";

const NO_HISTORY: &str = "Nenhum histórico anterior.";

/// One message of the conversation so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: String,
    pub content: String,
}

impl Turn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Builds the data block and prompt for one chat message.
pub struct ContextBuilder<'a> {
    store: &'a TableStore,
    extractor: &'a IntentExtractor,
    config: ContextConfig,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(store: &'a TableStore, extractor: &'a IntentExtractor, config: ContextConfig) -> Self {
        Self {
            store,
            extractor,
            config,
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Rows of every intent table, filtered by the detected entities.
    ///
    /// An entity only filters tables that have its column. Tables that are
    /// not registered or fail to load are dropped with a warning; any other
    /// error is returned.
    pub fn gather(&self, intent: &Intent) -> Result<Vec<(String, Table)>, TableError> {
        let mut requests: Vec<(String, Filter)> = Vec::with_capacity(intent.tables.len());
        for name in &intent.tables {
            match self.store.get_table(name) {
                Ok(table) => requests.push((name.clone(), entity_filter(&table, intent))),
                Err(err @ (TableError::UnknownTable { .. } | TableError::DataLoad { .. })) => {
                    log::warn!("context: leaving out table '{}': {}", name, err);
                }
                Err(err) => return Err(err),
            }
        }
        self.store.query_many(&requests)
    }

    /// Text block describing the gathered tables. Empty tables are skipped;
    /// nothing to show gives an empty string.
    pub fn format_tables(&self, results: &[(String, Table)]) -> String {
        let mut out = String::new();
        for (name, table) in results {
            if table.is_empty() {
                continue;
            }
            let _ = writeln!(out, "**{}** ({} registros):", name, table.len());

            let columns = self.display_columns(table);
            if table.len() <= self.config.max_rows_verbatim {
                out.push_str(&render_text_table(table, &columns));
            } else {
                let mut stats_lines = String::new();
                for column in &columns {
                    // Text and date columns have no statistics.
                    if let Ok(Some(stats)) = column_stats(table, column) {
                        let _ = writeln!(
                            stats_lines,
                            "  - {}: média={:.2}, min={:.2}, max={:.2}",
                            column, stats.mean, stats.min, stats.max
                        );
                    }
                }
                if !stats_lines.is_empty() {
                    out.push_str("Estatísticas:\n");
                    out.push_str(&stats_lines);
                }
            }
            out.push('\n');
        }

        if out.is_empty() {
            out
        } else {
            format!("**DADOS RELEVANTES:**\n\n{out}")
        }
    }

    /// Period-over-period block for the intent's entities.
    ///
    /// Empty unless a temporal section is configured, both period tables are
    /// registered, an entity filters both of them and each period has a mean
    /// for it. A period table that fails to load is left out with a warning.
    pub fn temporal_analysis(&self, intent: &Intent) -> Result<String, TableError> {
        let Some(temporal) = &self.config.temporal else {
            return Ok(String::new());
        };
        if intent.entities.is_empty() {
            return Ok(String::new());
        }
        if !self.store.contains(&temporal.before) || !self.store.contains(&temporal.after) {
            log::debug!(
                "temporal: periods '{}'/'{}' are not registered",
                temporal.before,
                temporal.after
            );
            return Ok(String::new());
        }

        let (Some(before), Some(after)) = (
            self.period_rows(&temporal.before, intent)?,
            self.period_rows(&temporal.after, intent)?,
        ) else {
            return Ok(String::new());
        };

        let comparison = compare_tables(&before, &after, &[], &temporal.metric)?;
        let Some(row) = comparison.row(0) else {
            return Ok(String::new());
        };
        // No group columns: before mean, after mean, delta_abs, delta_pct.
        let means = row.values();
        let (Some(before_mean), Some(after_mean)) = (means[0].as_f64(), means[1].as_f64()) else {
            return Ok(String::new());
        };
        let variation = means[3]
            .as_f64()
            .map(format_variation)
            .unwrap_or_else(|| "n/d".to_string());

        let mut out = String::from("**ANÁLISE TEMPORAL:**\n");
        let _ = writeln!(
            out,
            "- {} {}: {}",
            temporal.label,
            temporal.before_label(),
            format_currency(before_mean)
        );
        let _ = writeln!(
            out,
            "- {} {}: {}",
            temporal.label,
            temporal.after_label(),
            format_currency(after_mean)
        );
        let _ = writeln!(out, "- Variação: {variation}\n");
        Ok(out)
    }

    /// Rows of one period table matching the intent's entities, `None` when
    /// no entity applies to the table or it fails to load.
    fn period_rows(&self, name: &str, intent: &Intent) -> Result<Option<Table>, TableError> {
        let table = match self.store.get_table(name) {
            Ok(table) => table,
            Err(err @ TableError::DataLoad { .. }) => {
                log::warn!("temporal: leaving out period '{}': {}", name, err);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        let filter = entity_filter(&table, intent);
        if filter.is_empty() {
            return Ok(None);
        }
        filter_table(&table, &filter).map(Some)
    }

    /// Full prompt for `message`: data found for its intent, instructions,
    /// recent history and the question itself.
    pub fn build_prompt(&self, message: &str, history: &[Turn]) -> Result<String, TableError> {
        let intent = self.extractor.analyze(message);
        log::debug!(
            "intent: tables={:?} topic={} entities={}",
            intent.tables,
            intent.topic,
            intent.entities.len()
        );

        let data = if intent.needs_data() {
            let mut data = self.format_tables(&self.gather(&intent)?);
            data.push_str(&self.temporal_analysis(&intent)?);
            data
        } else {
            String::new()
        };

        let mut prompt = String::new();
        let _ = writeln!(prompt, "{PREAMBLE}\n");
        if !data.is_empty() {
            let _ = writeln!(prompt, "{}", data.trim_end());
            prompt.push('\n');
        }
        let _ = writeln!(prompt, "{INSTRUCTIONS}\n");
        let _ = writeln!(prompt, "**Histórico da conversa:**\n{}\n", self.format_history(history));
        let _ = writeln!(prompt, "**Pergunta do usuário:**\n{message}\n");
        prompt.push_str("**Sua resposta:**");
        Ok(prompt)
    }

    /// The last `history_turns` turns as `ROLE: content` lines.
    pub fn format_history(&self, history: &[Turn]) -> String {
        if history.is_empty() || self.config.history_turns == 0 {
            return NO_HISTORY.to_string();
        }
        let start = history.len().saturating_sub(self.config.history_turns);
        history[start..]
            .iter()
            .map(|turn| format!("{}: {}", turn.role.to_uppercase(), turn.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn display_columns(&self, table: &Table) -> Vec<String> {
        let configured: Vec<String> = self
            .config
            .display_columns
            .iter()
            .filter(|c| table.has_column(c))
            .cloned()
            .collect();
        if configured.is_empty() {
            table.column_names()
        } else {
            configured
        }
    }
}

fn entity_filter(table: &Table, intent: &Intent) -> Filter {
    let mut filter = Filter::new();
    for entity in &intent.entities {
        if table.has_column(&entity.column) {
            filter = filter.eq(entity.column.clone(), entity.value.clone());
        }
    }
    filter
}

/// Markdown overview of every registered table.
///
/// Loads each table for its row count; a table that fails to load is listed
/// with the error instead.
pub fn tables_summary(store: &TableStore) -> String {
    let mut out = String::from("## Tabelas disponíveis\n\n");
    for name in store.list_tables() {
        let info = match store.table_info(&name) {
            Ok(info) => info,
            Err(err) => {
                log::warn!("summary: table '{}' unavailable: {}", name, err);
                let _ = writeln!(out, "**{name}**: indisponível ({err})\n");
                continue;
            }
        };
        let _ = writeln!(out, "**{}**: {}", info.name, info.description);
        let _ = writeln!(out, "  - Registros: {}", info.rows);
        if !info.key_columns.is_empty() {
            let _ = writeln!(out, "  - Colunas-chave: {}", info.key_columns.join(", "));
        }
        out.push('\n');
    }
    out
}
