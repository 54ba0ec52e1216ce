use serde::{Deserialize, Serialize};

/// Prompt-building options, the `[context]` section of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextConfig {
    /// Tables with at most this many rows are shown row by row; larger ones
    /// are summarized as statistics.
    pub max_rows_verbatim: usize,
    /// Chat turns kept in the prompt, most recent last.
    pub history_turns: usize,
    /// Columns shown for each table, in this order. Empty shows all columns.
    pub display_columns: Vec<String>,
    /// Period-over-period block for detected entities, `[context.temporal]`.
    pub temporal: Option<TemporalConfig>,
}

/// Two tables holding the same metric for consecutive periods.
///
/// When a message names an entity both tables can be filtered on, the
/// prompt gets the entity's mean metric in each period and the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemporalConfig {
    pub metric: String,
    pub before: String,
    pub after: String,
    /// Line label for the metric, e.g. "Prêmio médio".
    #[serde(default = "default_metric_label")]
    pub label: String,
    /// Period names shown in the block; the table names when unset.
    #[serde(default)]
    pub before_label: Option<String>,
    #[serde(default)]
    pub after_label: Option<String>,
}

fn default_metric_label() -> String {
    "Prêmio médio".to_string()
}

impl TemporalConfig {
    pub fn new(metric: impl Into<String>, before: impl Into<String>, after: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            before: before.into(),
            after: after.into(),
            label: default_metric_label(),
            before_label: None,
            after_label: None,
        }
    }

    pub fn before_label(&self) -> &str {
        self.before_label.as_deref().unwrap_or(&self.before)
    }

    pub fn after_label(&self) -> &str {
        self.after_label.as_deref().unwrap_or(&self.after)
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_rows_verbatim: 5,
            history_turns: 5,
            display_columns: Vec::new(),
            temporal: None,
        }
    }
}
