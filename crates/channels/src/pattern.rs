use {
    serde::{Deserialize, Serialize},
    stubwire_matching::{CustomMatchers, Request, RequestMatcher, RequestPattern},
};

use crate::{channel::MessageChannel, types::ChannelType};

/// Selects channels by type and by the request that opened them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPattern {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub channel_type: Option<ChannelType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiating_request_pattern: Option<RequestPattern>,
}

impl ChannelPattern {
    pub fn for_request(pattern: RequestPattern) -> Self {
        Self {
            channel_type: None,
            initiating_request_pattern: Some(pattern),
        }
    }

    pub fn with_type(mut self, channel_type: ChannelType) -> Self {
        self.channel_type = Some(channel_type);
        self
    }

    pub fn matches(
        &self,
        channel: &dyn MessageChannel,
        matcher: &dyn RequestMatcher,
        custom: &CustomMatchers,
    ) -> bool {
        self.matches_parts(
            channel.channel_type(),
            channel.initiating_request(),
            matcher,
            custom,
        )
    }

    /// Match against a channel's type and opening request without the
    /// channel itself, e.g. for journaled events.
    pub fn matches_parts(
        &self,
        channel_type: ChannelType,
        request: Option<&Request>,
        matcher: &dyn RequestMatcher,
        custom: &CustomMatchers,
    ) -> bool {
        if self.channel_type.is_some_and(|t| t != channel_type) {
            return false;
        }
        match (&self.initiating_request_pattern, request) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(pattern), Some(request)) => matcher.is_exact_match(request, pattern, custom),
        }
    }
}

/// Where an outbound message is delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChannelTarget {
    /// The channel that delivered the triggering message.
    Originating,
    /// Every open channel whose opening request matches.
    RequestInitiated {
        #[serde(
            default,
            rename = "channelType",
            skip_serializing_if = "Option::is_none"
        )]
        channel_type: Option<ChannelType>,
        #[serde(rename = "requestPattern")]
        request_pattern: RequestPattern,
    },
}

impl ChannelTarget {
    pub fn originating() -> Self {
        Self::Originating
    }

    pub fn request_initiated(request_pattern: RequestPattern) -> Self {
        Self::RequestInitiated {
            channel_type: None,
            request_pattern,
        }
    }

    pub fn request_initiated_of_type(
        channel_type: ChannelType,
        request_pattern: RequestPattern,
    ) -> Self {
        Self::RequestInitiated {
            channel_type: Some(channel_type),
            request_pattern,
        }
    }

    pub fn is_originating(&self) -> bool {
        matches!(self, Self::Originating)
    }
}
