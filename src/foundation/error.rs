use crate::foundation::core::{InputKind, Intent, RunState};

pub type WatermarkResult<T> = Result<T, WatermarkError>;

#[derive(thiserror::Error, Debug)]
pub enum WatermarkError {
    /// `run` was requested from `Idle` before every required input was configured.
    #[error("missing input: {}", join_inputs(.missing))]
    MissingInput { missing: Vec<InputKind> },

    /// The requested intent is not allowed from the current state.
    #[error("invalid transition: can't {intent} while {state}")]
    InvalidTransition { intent: Intent, state: RunState },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("image processing error: {0}")]
    Image(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WatermarkError {
    pub fn missing_input(missing: Vec<InputKind>) -> Self {
        Self::MissingInput { missing }
    }

    pub fn invalid_transition(intent: Intent, state: RunState) -> Self {
        Self::InvalidTransition { intent, state }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn image(msg: impl Into<String>) -> Self {
        Self::Image(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Control errors are the only ones the engine hands back to its caller.
    pub fn is_control_error(&self) -> bool {
        matches!(
            self,
            Self::MissingInput { .. } | Self::InvalidTransition { .. } | Self::Configuration(_)
        )
    }
}

fn join_inputs(missing: &[InputKind]) -> String {
    missing
        .iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
