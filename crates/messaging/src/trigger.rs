use {
    serde::{Deserialize, Serialize},
    stubwire_channels::{ChannelPattern, MessageChannel},
    stubwire_entity::Message,
    stubwire_matching::{CustomMatchers, Request, RequestMatcher, RequestPattern},
    uuid::Uuid,
};

use crate::pattern::MessagePattern;

/// When a message stub fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessageTrigger {
    /// An inbound message on a matching channel.
    Message {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        channel: Option<ChannelPattern>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<MessagePattern>,
    },
    /// A specific HTTP stub served a request.
    HttpStub {
        #[serde(rename = "stubId")]
        stub_id: Uuid,
    },
    /// An HTTP request matched, whichever stub served it.
    HttpRequest {
        #[serde(rename = "requestPattern")]
        request_pattern: RequestPattern,
    },
}

impl MessageTrigger {
    pub fn any_message() -> Self {
        Self::Message {
            channel: None,
            message: None,
        }
    }

    pub fn message(channel: Option<ChannelPattern>, message: Option<MessagePattern>) -> Self {
        Self::Message { channel, message }
    }

    pub fn http_stub(stub_id: Uuid) -> Self {
        Self::HttpStub { stub_id }
    }

    pub fn http_request(request_pattern: RequestPattern) -> Self {
        Self::HttpRequest { request_pattern }
    }

    pub fn is_message(&self) -> bool {
        matches!(self, Self::Message { .. })
    }

    pub fn is_http(&self) -> bool {
        !self.is_message()
    }

    /// Whether an inbound message fires this trigger. HTTP triggers never do.
    pub fn matches_message(
        &self,
        channel: &dyn MessageChannel,
        incoming: &Message,
        matcher: &dyn RequestMatcher,
        custom: &CustomMatchers,
    ) -> bool {
        match self {
            Self::Message {
                channel: channel_pattern,
                message,
            } => {
                channel_pattern
                    .as_ref()
                    .is_none_or(|p| p.matches(channel, matcher, custom))
                    && message
                        .as_ref()
                        .is_none_or(|p| p.matches(channel, incoming, matcher, custom))
            },
            Self::HttpStub { .. } | Self::HttpRequest { .. } => false,
        }
    }

    /// Whether an HTTP request, optionally served by `stub_id`, fires this
    /// trigger. Message triggers never do.
    pub fn matches_http(
        &self,
        stub_id: Option<Uuid>,
        request: &Request,
        matcher: &dyn RequestMatcher,
        custom: &CustomMatchers,
    ) -> bool {
        match self {
            Self::Message { .. } => false,
            Self::HttpStub { stub_id: expected } => stub_id == Some(*expected),
            Self::HttpRequest { request_pattern } => {
                matcher.is_exact_match(request, request_pattern, custom)
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::HttpStub { .. } => "http-stub",
            Self::HttpRequest { .. } => "http-request",
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        serde_json::json,
        std::sync::Arc,
        stubwire_channels::{
            ChannelTransport, ChannelType, InMemoryTransport, RequestInitiatedMessageChannel,
        },
        stubwire_matching::{ContentPattern, DefaultRequestMatcher},
    };

    #[test]
    fn message_trigger_wire_shape() {
        let trigger: MessageTrigger = serde_json::from_value(json!({
            "type": "message",
            "channel": {"type": "websocket", "initiatingRequestPattern": {"urlPath": "/chat"}},
            "message": {"body": {"equalTo": "ping"}}
        }))
        .unwrap();
        let MessageTrigger::Message { channel, message } = &trigger else {
            panic!("expected message trigger");
        };
        assert_eq!(channel.as_ref().unwrap().channel_type, Some(ChannelType::Websocket));
        assert_eq!(
            message.as_ref().unwrap().body,
            Some(ContentPattern::equal_to("ping"))
        );
    }

    #[test]
    fn http_triggers_wire_shape() {
        let id = Uuid::new_v4();
        let value = serde_json::to_value(MessageTrigger::http_stub(id)).unwrap();
        assert_eq!(value, json!({"type": "http-stub", "stubId": id.to_string()}));

        let value =
            serde_json::to_value(MessageTrigger::http_request(RequestPattern::for_url("/api/trigger")))
                .unwrap();
        assert_eq!(
            value,
            json!({"type": "http-request", "requestPattern": {"url": "/api/trigger"}})
        );
    }

    #[test]
    fn unknown_trigger_type_names_the_tag() {
        let err = serde_json::from_value::<MessageTrigger>(json!({"type": "cron"})).unwrap_err();
        assert!(err.to_string().contains("cron"));
    }

    #[test]
    fn http_matching() {
        let custom = CustomMatchers::new();
        let id = Uuid::new_v4();
        let request = Request::post("/api/trigger");

        assert!(MessageTrigger::http_stub(id).matches_http(Some(id), &request, &DefaultRequestMatcher, &custom));
        assert!(!MessageTrigger::http_stub(id).matches_http(None, &request, &DefaultRequestMatcher, &custom));

        let by_request = MessageTrigger::http_request(RequestPattern::for_url("/api/trigger"));
        assert!(by_request.matches_http(None, &request, &DefaultRequestMatcher, &custom));
        assert!(!by_request.matches_http(None, &Request::get("/api/other"), &DefaultRequestMatcher, &custom));
        assert!(!MessageTrigger::any_message().matches_http(None, &request, &DefaultRequestMatcher, &custom));
    }

    #[test]
    fn message_matching_ignores_http_triggers() {
        let channel = RequestInitiatedMessageChannel::new(
            ChannelType::Websocket,
            Request::get("/chat"),
            Arc::new(InMemoryTransport::new()) as Arc<dyn ChannelTransport>,
        );
        let custom = CustomMatchers::new();
        let msg = Message::text("anything");
        assert!(MessageTrigger::any_message().matches_message(&channel, &msg, &DefaultRequestMatcher, &custom));
        assert!(
            !MessageTrigger::http_request(RequestPattern::any())
                .matches_message(&channel, &msg, &DefaultRequestMatcher, &custom)
        );
    }
}
