//! Prompt context for the insurance assistant.
//!
//! A message's intent picks the tables, detected entities filter them, and
//! the rows are rendered as a text block the LLM client appends to its
//! prompt. Data problems on single tables degrade the context instead of
//! failing the message.

pub mod builder;
pub mod config;
pub mod format;

pub use builder::{tables_summary, ContextBuilder, Turn};
pub use config::{ContextConfig, TemporalConfig};
pub use format::{format_currency, format_percentage, format_variation, render_text_table};
