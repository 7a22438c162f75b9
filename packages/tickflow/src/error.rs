use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A required input field is absent. `stage` is the slash-joined path of named stages
    /// that were active when the lookup failed (empty when raised by a bare `Tick`).
    #[error("stage `{stage}`: missing field `{field}`")]
    MissingField { stage: String, field: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("unknown processor kind `{0}`")]
    UnknownProcessor(String),

    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),

    /// The stream worker panicked or was aborted before it could return.
    #[error("stream worker aborted: {0}")]
    WorkerAborted(String),
}

impl EngineError {
    pub fn missing_field(field: impl Into<String>) -> Self {
        EngineError::MissingField {
            stage: String::new(),
            field: field.into(),
        }
    }

    /// Prefixes the stage path of a `MissingField` error with `scope`.
    ///
    /// Other variants are returned unchanged.
    pub fn within(self, scope: &str) -> Self {
        match self {
            EngineError::MissingField { stage, field } => {
                let stage = if stage.is_empty() {
                    scope.to_string()
                } else if scope.is_empty() {
                    stage
                } else {
                    format!("{scope}/{stage}")
                };
                EngineError::MissingField { stage, field }
            }
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::EngineError;

    #[test]
    fn within_builds_stage_path_innermost_last() {
        let err = EngineError::missing_field("close")
            .within("ema_fast")
            .within("macd");
        match &err {
            EngineError::MissingField { stage, field } => {
                assert_eq!(stage, "macd/ema_fast");
                assert_eq!(field, "close");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.to_string(), "stage `macd/ema_fast`: missing field `close`");
    }

    #[test]
    fn within_leaves_other_errors_alone() {
        let err = EngineError::UnknownProcessor("wma".into()).within("p");
        assert!(matches!(err, EngineError::UnknownProcessor(k) if k == "wma"));
    }
}
