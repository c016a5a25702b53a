use stubwire_common::FromMessage;

/// Errors raised while reading message stub mappings.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed mapping JSON, including unknown `type` tags.
    #[error("invalid message stub mapping: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{message}")]
    Message { message: String },
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

stubwire_common::impl_context!();
