use std::error::Error as StdError;

use uuid::Uuid;

/// Crate-wide result type for channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed channel errors shared across channel traits.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The channel was closed before the message could be sent.
    #[error("channel {channel_id} is closed")]
    ChannelClosed { channel_id: Uuid },

    /// The underlying transport failed to deliver.
    #[error("channel transport failed: {context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn closed(channel_id: Uuid) -> Self {
        Self::ChannelClosed { channel_id }
    }

    #[must_use]
    pub fn transport(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
