use serde::{Deserialize, Serialize};

use casco_tables::{TableError, TableStore, Value};

use crate::error::IntentError;
use crate::normalize::normalize;

/// Keywords that make a table relevant to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerRule {
    pub table: String,
    pub triggers: Vec<String>,
}

impl TriggerRule {
    pub fn new(table: impl Into<String>, triggers: &[&str]) -> Self {
        Self {
            table: table.into(),
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Keywords that classify a message under a topic label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopicRule {
    pub topic: String,
    pub triggers: Vec<String>,
}

impl TopicRule {
    pub fn new(topic: impl Into<String>, triggers: &[&str]) -> Self {
        Self {
            topic: topic.into(),
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Known values of one entity (a car model, a region, ...) and the table
/// column they come from.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityVocabulary {
    pub name: String,
    pub table: String,
    pub column: String,
    pub values: Vec<Value>,
}

impl EntityVocabulary {
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
        values: Vec<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            column: column.into(),
            values,
        }
    }

    /// Vocabulary made of the distinct values of a store column. Loads the table.
    pub fn from_store(
        store: &TableStore,
        name: impl Into<String>,
        table: &str,
        column: &str,
    ) -> Result<Self, TableError> {
        let values = store.unique_values(table, column)?;
        Ok(Self::new(name, table, column, values))
    }
}

// ---------------------------------------------------------------------------
// Compiled forms
// ---------------------------------------------------------------------------

/// Triggers normalized once, at registration.
pub(crate) fn compile_triggers(owner: &str, triggers: &[String]) -> Result<Vec<String>, IntentError> {
    if triggers.is_empty() {
        return Err(IntentError::NoTriggers {
            owner: owner.to_string(),
        });
    }
    triggers
        .iter()
        .map(|t| {
            let normalized = normalize(t);
            if normalized.is_empty() {
                Err(IntentError::EmptyTrigger {
                    owner: owner.to_string(),
                    trigger: t.clone(),
                })
            } else {
                Ok(normalized)
            }
        })
        .collect()
}

/// Vocabulary values paired with their normalized text; values that
/// normalize to nothing are dropped.
pub(crate) fn compile_values(values: &[Value]) -> Vec<(String, Value)> {
    values
        .iter()
        .filter(|v| !v.is_missing())
        .filter_map(|v| {
            let normalized = normalize(&v.to_string());
            (!normalized.is_empty()).then(|| (normalized, v.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_parse_from_toml() {
        #[derive(Deserialize)]
        struct Rules {
            tables: Vec<TriggerRule>,
            topics: Vec<TopicRule>,
        }

        let input = r#"
[[tables]]
table = "sinistros"
triggers = ["sinistro", "colisão"]

[[topics]]
topic = "pricing"
triggers = ["preço", "prêmio"]
"#;
        let rules: Rules = toml::from_str(input).unwrap();
        assert_eq!(rules.tables[0], TriggerRule::new("sinistros", &["sinistro", "colisão"]));
        assert_eq!(rules.topics[0].topic, "pricing");
    }

    #[test]
    fn triggers_are_normalized() {
        let compiled = compile_triggers("t", &["Colisão".to_string(), " PRÊMIO ".to_string()]).unwrap();
        assert_eq!(compiled, vec!["colisao", "premio"]);
    }

    #[test]
    fn blank_triggers_are_rejected() {
        let err = compile_triggers("sinistros", &["??".to_string()]).unwrap_err();
        assert!(matches!(err, IntentError::EmptyTrigger { .. }));
        let err = compile_triggers("sinistros", &[]).unwrap_err();
        assert!(matches!(err, IntentError::NoTriggers { .. }));
    }

    #[test]
    fn values_skip_missing_and_blank() {
        let compiled = compile_values(&[
            Value::from("CIVIC"),
            Value::Missing,
            Value::from("--"),
            Value::from("HB20 1.0"),
        ]);
        let texts: Vec<&str> = compiled.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(texts, vec!["civic", "hb20 1 0"]);
    }
}
