//! Keyword intent extraction for the insurance assistant.
//!
//! Messages and triggers are normalized the same way (accents, case and
//! punctuation folded away) before substring matching, so "Preço" and
//! "preco" trigger the same rule.

pub mod error;
pub mod extractor;
pub mod normalize;
pub mod rules;

pub use error::IntentError;
pub use extractor::{Entity, Intent, IntentExtractor, DEFAULT_TOPIC};
pub use normalize::normalize;
pub use rules::{EntityVocabulary, TopicRule, TriggerRule};
