use serde::Serialize;

use casco_tables::Value;

use crate::error::IntentError;
use crate::normalize::{contains_words, normalize};
use crate::rules::{compile_triggers, compile_values, EntityVocabulary, TopicRule, TriggerRule};

/// Topic reported when no topic rule matches.
pub const DEFAULT_TOPIC: &str = "general";

/// An entity value found in a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub name: String,
    pub table: String,
    pub column: String,
    pub value: Value,
}

/// What a message is about.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Intent {
    /// Relevant tables: trigger matches in rule order, then tables pointed
    /// to by detected entities. No duplicates.
    pub tables: Vec<String>,
    pub topic: String,
    pub entities: Vec<Entity>,
}

impl Intent {
    pub fn needs_data(&self) -> bool {
        !self.tables.is_empty()
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }
}

struct CompiledRule<R> {
    rule: R,
    triggers: Vec<String>,
}

impl<R> CompiledRule<R> {
    fn matches(&self, normalized: &str) -> bool {
        self.triggers.iter().any(|t| normalized.contains(t.as_str()))
    }
}

struct CompiledVocabulary {
    vocabulary: EntityVocabulary,
    /// (normalized text, original value)
    values: Vec<(String, Value)>,
}

impl CompiledVocabulary {
    /// Longest value present as whole words; the first one wins ties.
    fn find(&self, normalized: &str) -> Option<&Value> {
        let mut best: Option<&(String, Value)> = None;
        for candidate in &self.values {
            if !contains_words(normalized, &candidate.0) {
                continue;
            }
            if best.map_or(true, |b| candidate.0.len() > b.0.len()) {
                best = Some(candidate);
            }
        }
        best.map(|(_, value)| value)
    }
}

/// Keyword-based intent extraction over an explicit, ordered rule list.
#[derive(Default)]
pub struct IntentExtractor {
    rules: Vec<CompiledRule<TriggerRule>>,
    topics: Vec<CompiledRule<TopicRule>>,
    vocabularies: Vec<CompiledVocabulary>,
}

impl IntentExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extractor over the given table rules, in order.
    pub fn with_rules(rules: impl IntoIterator<Item = TriggerRule>) -> Result<Self, IntentError> {
        let mut extractor = Self::new();
        for rule in rules {
            extractor.add_rule(rule)?;
        }
        Ok(extractor)
    }

    pub fn add_rule(&mut self, rule: TriggerRule) -> Result<(), IntentError> {
        let triggers = compile_triggers(&rule.table, &rule.triggers)?;
        log::debug!("intent rule {} -> {:?}", rule.table, triggers);
        self.rules.push(CompiledRule { rule, triggers });
        Ok(())
    }

    pub fn add_topic(&mut self, topic: TopicRule) -> Result<(), IntentError> {
        let triggers = compile_triggers(&topic.topic, &topic.triggers)?;
        self.topics.push(CompiledRule {
            rule: topic,
            triggers,
        });
        Ok(())
    }

    pub fn add_vocabulary(&mut self, vocabulary: EntityVocabulary) {
        let values = compile_values(&vocabulary.values);
        log::debug!(
            "entity vocabulary '{}' from {}.{} ({} values)",
            vocabulary.name,
            vocabulary.table,
            vocabulary.column,
            values.len()
        );
        self.vocabularies.push(CompiledVocabulary { vocabulary, values });
    }

    /// Table rules in registration order.
    pub fn rules(&self) -> impl Iterator<Item = &TriggerRule> {
        self.rules.iter().map(|r| &r.rule)
    }

    pub fn topics(&self) -> impl Iterator<Item = &TopicRule> {
        self.topics.iter().map(|r| &r.rule)
    }

    pub fn vocabularies(&self) -> impl Iterator<Item = &EntityVocabulary> {
        self.vocabularies.iter().map(|v| &v.vocabulary)
    }

    /// Tables whose triggers occur in `text`, in rule order, without duplicates.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let normalized = normalize(text);
        let mut tables = Vec::new();
        self.push_rule_tables(&normalized, &mut tables);
        tables
    }

    /// Tables, topic and entities of a message.
    pub fn analyze(&self, text: &str) -> Intent {
        let normalized = normalize(text);

        let mut tables = Vec::new();
        self.push_rule_tables(&normalized, &mut tables);

        let mut entities = Vec::new();
        for compiled in &self.vocabularies {
            if let Some(value) = compiled.find(&normalized) {
                let vocabulary = &compiled.vocabulary;
                if !tables.contains(&vocabulary.table) {
                    tables.push(vocabulary.table.clone());
                }
                entities.push(Entity {
                    name: vocabulary.name.clone(),
                    table: vocabulary.table.clone(),
                    column: vocabulary.column.clone(),
                    value: value.clone(),
                });
            }
        }

        let topic = self
            .topics
            .iter()
            .find(|t| t.matches(&normalized))
            .map_or_else(|| DEFAULT_TOPIC.to_string(), |t| t.rule.topic.clone());

        Intent {
            tables,
            topic,
            entities,
        }
    }

    fn push_rule_tables(&self, normalized: &str, tables: &mut Vec<String>) {
        for compiled in &self.rules {
            if compiled.matches(normalized) && !tables.contains(&compiled.rule.table) {
                tables.push(compiled.rule.table.clone());
            }
        }
    }
}
