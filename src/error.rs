use thiserror::Error;

#[derive(Error, Debug)]
pub enum SwutrackError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("System error: {message}")]
    System { message: String },
}

/// Failures of the HTTP API service
#[derive(Error, Debug)]
pub enum HttpApiError {
    #[error("failed to bind {address}: {source}")]
    BindFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server failed: {source}")]
    ServeFailed {
        #[source]
        source: std::io::Error,
    },

    #[error("graceful shutdown interrupted before completion")]
    ShutdownInterrupted,
}

impl SwutrackError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SwutrackError>;
