use std::{fmt, sync::Arc};

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    stubwire_channels::{ChannelType, MessageChannel},
    stubwire_entity::Message,
    stubwire_matching::Request,
    uuid::Uuid,
};

use crate::mapping::MessageStubMapping;

/// Direction of an observed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Received,
    Sent,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Sent => "sent",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed inbound or outbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageServeEvent {
    pub id: Uuid,
    pub event_type: EventType,
    pub channel_type: ChannelType,
    pub channel_id: Uuid,
    /// Request that opened the channel, kept so journal queries can match
    /// channel patterns after the channel is gone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_request: Option<Request>,
    pub message: Message,
    pub was_matched: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stub_mapping: Option<Arc<MessageStubMapping>>,
}

impl MessageServeEvent {
    fn new(
        event_type: EventType,
        channel: &dyn MessageChannel,
        message: Message,
        stub_mapping: Option<Arc<MessageStubMapping>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            channel_type: channel.channel_type(),
            channel_id: channel.id(),
            channel_request: channel.initiating_request().cloned(),
            message,
            was_matched: stub_mapping.is_some(),
            timestamp: Utc::now(),
            stub_mapping,
        }
    }

    pub fn received(
        channel: &dyn MessageChannel,
        message: Message,
        stub_mapping: Option<Arc<MessageStubMapping>>,
    ) -> Self {
        Self::new(EventType::Received, channel, message, stub_mapping)
    }

    pub fn sent(channel: &dyn MessageChannel, message: Message, stub_mapping: Arc<MessageStubMapping>) -> Self {
        Self::new(EventType::Sent, channel, message, Some(stub_mapping))
    }

    pub fn is_received(&self) -> bool {
        self.event_type == EventType::Received
    }

    pub fn stub_id(&self) -> Option<Uuid> {
        self.stub_mapping.as_ref().map(|s| s.id())
    }
}
