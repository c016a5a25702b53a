use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
    stubwire_channels::ChannelTarget,
    stubwire_entity::MessageDefinition,
};

/// Something a message stub does when it fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessageAction {
    Send(SendMessageAction),
}

impl MessageAction {
    pub fn send(message: MessageDefinition, channel_target: ChannelTarget) -> Self {
        Self::Send(SendMessageAction::new(message, channel_target))
    }
}

impl From<SendMessageAction> for MessageAction {
    fn from(action: SendMessageAction) -> Self {
        Self::Send(action)
    }
}

/// Send a message to the channels a target resolves to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageAction {
    #[serde(default)]
    pub message: MessageDefinition,
    pub channel_target: ChannelTarget,
    /// Named transformers applied in order before the body is resolved.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transformers: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub transformer_parameters: Map<String, Value>,
}

impl SendMessageAction {
    pub fn new(message: MessageDefinition, channel_target: ChannelTarget) -> Self {
        Self {
            message,
            channel_target,
            transformers: Vec::new(),
            transformer_parameters: Map::new(),
        }
    }

    pub fn to_originating(message: MessageDefinition) -> Self {
        Self::new(message, ChannelTarget::Originating)
    }

    pub fn with_transformer(mut self, name: impl Into<String>) -> Self {
        self.transformers.push(name.into());
        self
    }

    pub fn with_transformer_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.transformer_parameters.insert(key.into(), value);
        self
    }
}
