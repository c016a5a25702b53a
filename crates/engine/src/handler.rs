use std::sync::Arc;

use {
    async_trait::async_trait,
    stubwire_channels::{MessageChannel, MessageChannels},
    stubwire_entity::{EntityResolver, Message, StoreAccess},
    stubwire_journal::MessageJournal,
    stubwire_matching::{CustomMatchers, Request},
    tokio::runtime::{Handle, RuntimeFlavor},
    stubwire_messaging::{
        MessageAction, MessageServeEvent, MessageStubMapping, MessageStubMappings,
        SendMessageAction, TransformContext, Transformers,
    },
    tracing::{debug, info, warn},
    uuid::Uuid,
};

#[cfg(feature = "metrics")]
use stubwire_metrics::{counter, labels, messages as msg_metrics};

use crate::context::MessageActionContext;

/// An ordinary HTTP request has been matched (or not) by the HTTP stubbing
/// layer.
#[derive(Debug, Clone)]
pub struct HttpMatchEvent {
    pub request: Request,
    /// Id of the HTTP stub that served the request, if one did.
    pub stub_mapping_id: Option<Uuid>,
}

impl HttpMatchEvent {
    pub fn new(request: Request, stub_mapping_id: Option<Uuid>) -> Self {
        Self {
            request,
            stub_mapping_id,
        }
    }
}

/// Hook the HTTP stubbing layer calls after each request is matched.
#[async_trait]
pub trait HttpStubServeEventListener: Send + Sync {
    async fn after_match(&self, event: &HttpMatchEvent);
}

/// Runs message stubs for inbound channel messages and HTTP triggers.
pub struct MessageStubRequestHandler {
    channels: Arc<MessageChannels>,
    stubs: Arc<MessageStubMappings>,
    journal: Arc<dyn MessageJournal>,
    resolver: EntityResolver,
    stores: Option<Arc<dyn StoreAccess>>,
    transformers: Transformers,
    custom: CustomMatchers,
}

impl MessageStubRequestHandler {
    pub fn new(
        channels: Arc<MessageChannels>,
        stubs: Arc<MessageStubMappings>,
        journal: Arc<dyn MessageJournal>,
    ) -> Self {
        Self {
            channels,
            stubs,
            journal,
            resolver: EntityResolver::default(),
            stores: None,
            transformers: Transformers::new(),
            custom: CustomMatchers::new(),
        }
    }

    pub fn with_resolver(mut self, resolver: EntityResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_stores(mut self, stores: Arc<dyn StoreAccess>) -> Self {
        self.stores = Some(stores);
        self
    }

    pub fn with_transformers(mut self, transformers: Transformers) -> Self {
        self.transformers = transformers;
        self
    }

    pub fn with_custom_matchers(mut self, custom: CustomMatchers) -> Self {
        self.custom = custom;
        self
    }

    pub fn custom_matchers(&self) -> &CustomMatchers {
        &self.custom
    }

    /// Handle one inbound message: fire the highest-priority matching stub
    /// and journal exactly one received event. Returns the stub that fired.
    pub async fn process_message(
        &self,
        channel: &Arc<dyn MessageChannel>,
        message: Message,
    ) -> Option<Arc<MessageStubMapping>> {
        let stub = self
            .stubs
            .find_matching_stub(channel.as_ref(), &message, &self.custom);

        match &stub {
            Some(stub) => {
                debug!(
                    channel_id = %channel.id(),
                    stub_id = %stub.id(),
                    stub = %stub.label(),
                    "message matched stub"
                );
                #[cfg(feature = "metrics")]
                counter!(msg_metrics::MATCHED_TOTAL, labels::CHANNEL_TYPE => channel.channel_type().as_str())
                    .increment(1);
                let context = MessageActionContext::for_message(
                    Arc::clone(stub),
                    Arc::clone(channel),
                    message.clone(),
                );
                self.execute_actions(&context).await;
            },
            None => {
                debug!(channel_id = %channel.id(), "no message stub matched");
                #[cfg(feature = "metrics")]
                counter!(msg_metrics::UNMATCHED_TOTAL, labels::CHANNEL_TYPE => channel.channel_type().as_str())
                    .increment(1);
            },
        }

        #[cfg(feature = "metrics")]
        counter!(msg_metrics::RECEIVED_TOTAL, labels::CHANNEL_TYPE => channel.channel_type().as_str())
            .increment(1);
        self.journal.message_received(MessageServeEvent::received(
            channel.as_ref(),
            message,
            stub.clone(),
        ));
        stub
    }

    /// Fire every HTTP-triggered stub for `event`. Returns how many fired.
    pub async fn handle_http_match(&self, event: &HttpMatchEvent) -> usize {
        let stubs = self
            .stubs
            .find_http_triggered(event.stub_mapping_id, &event.request, &self.custom);
        for stub in &stubs {
            info!(
                stub_id = %stub.id(),
                stub = %stub.label(),
                url = %event.request.url,
                trigger = stub.trigger().kind(),
                "HTTP request triggered message stub"
            );
            #[cfg(feature = "metrics")]
            counter!(msg_metrics::HTTP_TRIGGERED_TOTAL, labels::TRIGGER => stub.trigger().kind())
                .increment(1);
            let context = MessageActionContext::for_http(
                Arc::clone(stub),
                event.request.clone(),
                event.stub_mapping_id,
            );
            self.execute_actions(&context).await;
        }
        stubs.len()
    }

    /// Run a stub's actions in order. Returns how many messages were delivered.
    pub async fn execute_actions(&self, context: &MessageActionContext) -> usize {
        let mut delivered = 0;
        for action in context.stub().actions() {
            delivered += match action {
                MessageAction::Send(send) => self.execute_send(send, context).await,
            };
        }
        delivered
    }

    async fn execute_send(&self, action: &SendMessageAction, context: &MessageActionContext) -> usize {
        let transform_context = TransformContext {
            stub: context.stub(),
            incoming: context.incoming_message(),
            request: context.request(),
            parameters: &action.transformer_parameters,
        };
        let definition =
            self.transformers
                .apply(&action.transformers, action.message.clone(), &transform_context);
        let message = run_blocking(|| {
            self.resolver
                .resolve_message(&definition, self.stores.as_deref())
        });

        let targets = self.channels.resolve_target(
            &action.channel_target,
            context.originating_channel(),
            &self.custom,
        );
        if targets.is_empty() {
            debug!(stub_id = %context.stub().id(), "send target resolved to no channels");
            return 0;
        }

        let mut delivered = 0;
        for channel in targets {
            match channel.send_message(&message).await {
                Ok(()) => {
                    delivered += 1;
                    #[cfg(feature = "metrics")]
                    counter!(msg_metrics::SENT_TOTAL, labels::CHANNEL_TYPE => channel.channel_type().as_str())
                        .increment(1);
                    self.journal.message_received(MessageServeEvent::sent(
                        channel.as_ref(),
                        message.clone(),
                        Arc::clone(context.stub()),
                    ));
                },
                Err(e) => {
                    warn!(channel_id = %channel.id(), error = %e, "failed to send message");
                    #[cfg(feature = "metrics")]
                    counter!(msg_metrics::SEND_ERRORS_TOTAL).increment(1);
                },
            }
        }
        delivered
    }
}

#[async_trait]
impl HttpStubServeEventListener for MessageStubRequestHandler {
    async fn after_match(&self, event: &HttpMatchEvent) {
        self.handle_http_match(event).await;
    }
}

/// Run store reads that may touch the filesystem. A multi-threaded runtime
/// hands the worker's other tasks off while `f` blocks; a current-thread
/// runtime cannot, so `f` runs inline there.
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        },
        _ => f(),
    }
}
