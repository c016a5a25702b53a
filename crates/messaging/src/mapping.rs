use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
    stubwire_channels::{ChannelTarget, MessageChannel},
    stubwire_entity::{Message, MessageDefinition},
    stubwire_matching::{CustomMatchers, RequestMatcher},
    uuid::Uuid,
};

use crate::{
    action::{MessageAction, SendMessageAction},
    pattern::MessagePattern,
    trigger::MessageTrigger,
};

/// Priority given to stubs that do not declare one. Lower numbers win.
pub const DEFAULT_PRIORITY: i32 = 5;

/// A rule pairing one trigger with the actions it fires.
///
/// Immutable once built; use [`MessageStubMapping::transform`] to derive a
/// modified copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStubMapping {
    #[serde(default = "Uuid::new_v4")]
    id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    priority: Option<i32>,
    trigger: MessageTrigger,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    actions: Vec<MessageAction>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    metadata: Map<String, Value>,
}

impl MessageStubMapping {
    pub fn builder() -> MessageStubMappingBuilder {
        MessageStubMappingBuilder::default()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The declared priority, if any.
    pub fn priority(&self) -> Option<i32> {
        self.priority
    }

    pub fn priority_or(&self, default: i32) -> i32 {
        self.priority.unwrap_or(default)
    }

    pub fn trigger(&self) -> &MessageTrigger {
        &self.trigger
    }

    pub fn actions(&self) -> &[MessageAction] {
        &self.actions
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Short label for logs: the name when present, else the id.
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }

    pub fn matches_message(
        &self,
        channel: &dyn MessageChannel,
        message: &Message,
        matcher: &dyn RequestMatcher,
        custom: &CustomMatchers,
    ) -> bool {
        self.trigger
            .matches_message(channel, message, matcher, custom)
    }

    /// A new mapping built from this one with the builder edits applied.
    #[must_use]
    pub fn transform(
        &self,
        edit: impl FnOnce(MessageStubMappingBuilder) -> MessageStubMappingBuilder,
    ) -> Self {
        edit(MessageStubMappingBuilder::from(self.clone())).build()
    }
}

// ── Builder ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct MessageStubMappingBuilder {
    id: Option<Uuid>,
    name: Option<String>,
    priority: Option<i32>,
    trigger: Option<MessageTrigger>,
    actions: Vec<MessageAction>,
    metadata: Map<String, Value>,
}

impl From<MessageStubMapping> for MessageStubMappingBuilder {
    fn from(mapping: MessageStubMapping) -> Self {
        Self {
            id: Some(mapping.id),
            name: mapping.name,
            priority: mapping.priority,
            trigger: Some(mapping.trigger),
            actions: mapping.actions,
            metadata: mapping.metadata,
        }
    }
}

impl MessageStubMappingBuilder {
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn trigger(mut self, trigger: MessageTrigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Trigger on inbound messages matching `pattern`.
    pub fn on_message(self, pattern: MessagePattern) -> Self {
        let channel = pattern.channel_pattern.clone();
        let message = MessagePattern {
            channel_pattern: None,
            body: pattern.body,
        };
        self.trigger(MessageTrigger::message(
            channel,
            (!message.is_anything()).then_some(message),
        ))
    }

    pub fn action(mut self, action: impl Into<MessageAction>) -> Self {
        self.actions.push(action.into());
        self
    }

    pub fn clear_actions(mut self) -> Self {
        self.actions.clear();
        self
    }

    pub fn send(self, message: MessageDefinition, target: ChannelTarget) -> Self {
        self.action(SendMessageAction::new(message, target))
    }

    pub fn reply(self, message: MessageDefinition) -> Self {
        self.send(message, ChannelTarget::Originating)
    }

    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Missing ids are generated; a missing trigger matches any message.
    pub fn build(self) -> MessageStubMapping {
        MessageStubMapping {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            name: self.name,
            priority: self.priority,
            trigger: self.trigger.unwrap_or_else(MessageTrigger::any_message),
            actions: self.actions,
            metadata: self.metadata,
        }
    }
}
