/// Error returned when reading [`PipelineConfig`](crate::config::PipelineConfig)
/// from the environment.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid number in {var}: {value}")]
    InvalidNumber { var: String, value: String },

    #[error("unknown severity in {var}: {value}")]
    UnknownSeverity { var: String, value: String },

    #[error("invalid boolean in {var}: {value}")]
    InvalidBool { var: String, value: String },
}

/// Error returned when installing the global subscriber.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled(#[from] tracing::subscriber::SetGlobalDefaultError),
}
