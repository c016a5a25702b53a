use {
    serde::{Deserialize, Serialize},
    stubwire_channels::{ChannelPattern, ChannelType, MessageChannel},
    stubwire_entity::Message,
    stubwire_matching::{ContentPattern, CustomMatchers, Request, RequestMatcher},
};

use crate::event::MessageServeEvent;

/// Predicate over a channel and a message body.
///
/// Both parts are optional; a missing part matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_pattern: Option<ChannelPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ContentPattern>,
}

impl MessagePattern {
    pub const ANYTHING: MessagePattern = MessagePattern {
        channel_pattern: None,
        body: None,
    };

    pub fn for_body(body: ContentPattern) -> Self {
        Self {
            channel_pattern: None,
            body: Some(body),
        }
    }

    pub fn for_channel(channel_pattern: ChannelPattern) -> Self {
        Self {
            channel_pattern: Some(channel_pattern),
            body: None,
        }
    }

    pub fn with_body(mut self, body: ContentPattern) -> Self {
        self.body = Some(body);
        self
    }

    pub fn is_anything(&self) -> bool {
        self.channel_pattern.is_none() && self.body.is_none()
    }

    pub fn matches(
        &self,
        channel: &dyn MessageChannel,
        message: &Message,
        matcher: &dyn RequestMatcher,
        custom: &CustomMatchers,
    ) -> bool {
        self.matches_parts(
            channel.channel_type(),
            channel.initiating_request(),
            message,
            matcher,
            custom,
        )
    }

    pub fn matches_event(
        &self,
        event: &MessageServeEvent,
        matcher: &dyn RequestMatcher,
        custom: &CustomMatchers,
    ) -> bool {
        self.matches_parts(
            event.channel_type,
            event.channel_request.as_ref(),
            &event.message,
            matcher,
            custom,
        )
    }

    fn matches_parts(
        &self,
        channel_type: ChannelType,
        request: Option<&Request>,
        message: &Message,
        matcher: &dyn RequestMatcher,
        custom: &CustomMatchers,
    ) -> bool {
        let channel_ok = self
            .channel_pattern
            .as_ref()
            .is_none_or(|p| p.matches_parts(channel_type, request, matcher, custom));
        channel_ok && self.body.as_ref().is_none_or(|body| body_matches(body, message))
    }
}

/// Binary patterns see raw bytes; text patterns see the decoded body, with a
/// missing body treated as an absent value.
pub fn body_matches(pattern: &ContentPattern, message: &Message) -> bool {
    if pattern.is_binary() {
        return pattern.matches_bytes(message.bytes());
    }
    pattern.matches_value(message.body_as_string().as_deref())
}
