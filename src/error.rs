//! Error types for finflow.

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Flow interpreter errors.
///
/// These indicate contract violations or flow-definition bugs, never
/// user-correctable input. Rejected input is `ValidationOutcome::Rejected`,
/// returned as data so the surface can render it inline.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Flow is not accepting input while {status}")]
    NotAcceptingInput { status: String },

    #[error("Step {step} is a multi-select step; toggle options and confirm instead")]
    ExpectsToggle { step: String },

    #[error("Step {step} is not a multi-select step")]
    NotMultiSelect { step: String },

    #[error("Option {option:?} is not offered by step {step}")]
    UnknownOption { step: String, option: String },

    #[error("Nothing selected on step {step}")]
    EmptySelection { step: String },

    #[error("Retry is only available after a recoverable submission failure")]
    RetryUnavailable,

    #[error("Flow definition bug: {0}")]
    Definition(String),

    #[error(transparent)]
    DuplicateAnswer(#[from] DuplicateAnswerError),
}

/// A step's answer was recorded twice in one flow run.
///
/// Guards against double-submission from a re-rendered button. This is a
/// programming-contract violation: log it, never show it to the user.
#[derive(Debug, thiserror::Error)]
#[error("Step {step_id} already has a recorded answer in this run")]
pub struct DuplicateAnswerError {
    pub step_id: String,
}

/// Backend gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Invalid response body: {0}")]
    InvalidBody(String),
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
