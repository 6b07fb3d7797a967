use thiserror::Error;

/// Errors raised while turning plugin settings into commands and running them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Tag unknown to the record type, or the field has a different kind.
    #[error("cannot resolve field '{tag}': {reason}")]
    FieldResolution { tag: String, reason: String },

    #[error("missing mandatory field {tag}")]
    MissingMandatoryField { tag: String },

    #[error("no usable credentials: {0}")]
    AuthSelection(String),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported operation: build tool '{tool}', command '{command}'")]
    UnsupportedOperation { tool: String, command: String },

    #[error("command '{command}' failed with exit status {}", display_status(.exit_status))]
    PipelineStepFailure {
        command: String,
        exit_status: Option<i32>,
    },
}

fn display_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "unknown (terminated by signal)".to_string(),
    }
}

impl EngineError {
    pub fn field(tag: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::FieldResolution {
            tag: tag.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(tag: impl Into<String>) -> Self {
        EngineError::MissingMandatoryField { tag: tag.into() }
    }

    /// Assembly-time errors happen before anything runs and are safe to retry
    /// once the input is fixed.
    pub fn is_assembly_error(&self) -> bool {
        !matches!(self, EngineError::PipelineStepFailure { .. })
    }
}
