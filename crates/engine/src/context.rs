use std::sync::Arc;

use {
    stubwire_channels::MessageChannel,
    stubwire_entity::Message,
    stubwire_matching::Request,
    stubwire_messaging::MessageStubMapping,
    uuid::Uuid,
};

/// What fired a stub.
#[derive(Debug, Clone)]
pub enum TriggerSource {
    /// A message arrived on `channel`.
    Message {
        channel: Arc<dyn MessageChannel>,
        message: Message,
    },
    /// An HTTP request was served, optionally by a known HTTP stub.
    Http {
        request: Request,
        stub_mapping_id: Option<Uuid>,
    },
}

/// Everything an action may consult while it runs.
#[derive(Debug, Clone)]
pub struct MessageActionContext {
    stub: Arc<MessageStubMapping>,
    source: TriggerSource,
}

impl MessageActionContext {
    pub fn for_message(
        stub: Arc<MessageStubMapping>,
        channel: Arc<dyn MessageChannel>,
        message: Message,
    ) -> Self {
        Self {
            stub,
            source: TriggerSource::Message { channel, message },
        }
    }

    pub fn for_http(
        stub: Arc<MessageStubMapping>,
        request: Request,
        stub_mapping_id: Option<Uuid>,
    ) -> Self {
        Self {
            stub,
            source: TriggerSource::Http {
                request,
                stub_mapping_id,
            },
        }
    }

    pub fn stub(&self) -> &Arc<MessageStubMapping> {
        &self.stub
    }

    pub fn source(&self) -> &TriggerSource {
        &self.source
    }

    pub fn is_message_triggered(&self) -> bool {
        matches!(self.source, TriggerSource::Message { .. })
    }

    /// The channel that delivered the triggering message. HTTP-triggered
    /// contexts have none, so `Originating` targets resolve to nothing.
    pub fn originating_channel(&self) -> Option<&Arc<dyn MessageChannel>> {
        match &self.source {
            TriggerSource::Message { channel, .. } => Some(channel),
            TriggerSource::Http { .. } => None,
        }
    }

    pub fn incoming_message(&self) -> Option<&Message> {
        match &self.source {
            TriggerSource::Message { message, .. } => Some(message),
            TriggerSource::Http { .. } => None,
        }
    }

    /// The originating channel's opening request, or the triggering HTTP request.
    pub fn request(&self) -> Option<&Request> {
        match &self.source {
            TriggerSource::Message { channel, .. } => channel.initiating_request(),
            TriggerSource::Http { request, .. } => Some(request),
        }
    }
}
