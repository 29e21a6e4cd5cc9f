use crate::notification::cycle::CycleOptionsBuilderError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("Missing config with key \"{key}\"")]
    MissingConfig { key: String },

    #[error("Invalid config \"{key}\" = \"{value}\": {msg}")]
    InvalidConfig {
        key: String,
        value: String,
        msg: String,
    },

    #[error("Configuration error: {msg}")]
    ConfigurationError { msg: String },

    #[error(transparent)]
    InvalidCycleOptions(#[from] CycleOptionsBuilderError),
}
