use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpectatorError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server rejected request ({status}): {message}")]
    Protocol { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Data(String),

    #[error("Unparsable timestamp '{raw}'")]
    Timing { raw: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SpectatorError {
    /// True when the server answered and refused the request.
    /// These messages are meant for the user; everything else is retried silently.
    pub fn is_protocol(&self) -> bool {
        matches!(self, SpectatorError::Protocol { .. })
    }
}

pub type SpectatorResult<T> = Result<T, SpectatorError>;
