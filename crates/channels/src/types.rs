use std::fmt;

use serde::{Deserialize, Serialize};

/// How a channel comes into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLifecycle {
    /// Opening is always preceded by the HTTP request that created it.
    RequestInitiated,
}

/// Which way messages flow on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directionality {
    Bidirectional,
}

/// Kind of message channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Websocket,
}

impl ChannelType {
    pub fn lifecycle(self) -> ChannelLifecycle {
        match self {
            Self::Websocket => ChannelLifecycle::RequestInitiated,
        }
    }

    pub fn directionality(self) -> Directionality {
        match self {
            Self::Websocket => Directionality::Bidirectional,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Websocket => "websocket",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_properties() {
        assert_eq!(
            ChannelType::Websocket.lifecycle(),
            ChannelLifecycle::RequestInitiated
        );
        assert_eq!(
            ChannelType::Websocket.directionality(),
            Directionality::Bidirectional
        );
        assert_eq!(
            serde_json::to_string(&ChannelType::Websocket).unwrap(),
            "\"websocket\""
        );
    }

    #[test]
    fn unknown_type_names_the_tag() {
        let err = serde_json::from_str::<ChannelType>("\"carrier-pigeon\"").unwrap_err();
        assert!(err.to_string().contains("carrier-pigeon"));
    }
}
