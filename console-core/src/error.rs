use thiserror::Error;

/// Failures talking to a remote gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("unexpected gateway response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(anyhow::Error),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Config(anyhow::Error::new(err))
    }
}
