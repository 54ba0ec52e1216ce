use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntentError {
    #[error("rule '{owner}' has no triggers")]
    NoTriggers { owner: String },

    #[error("trigger {trigger:?} of rule '{owner}' is empty after normalization")]
    EmptyTrigger { owner: String, trigger: String },
}
