use stubwire_common::FromMessage;

/// Errors raised while building or decoding message content.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The definition combines content sources or carries malformed data.
    #[error("invalid entity definition: {message}")]
    InvalidInput { message: String },

    #[error("failed to decompress {compression} body: {source}")]
    Decompress {
        compression: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn decompress(compression: impl std::fmt::Display, source: std::io::Error) -> Self {
        Self::Decompress {
            compression: compression.to_string(),
            source,
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

stubwire_common::impl_context!();
