use std::{
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use {
    async_trait::async_trait, stubwire_entity::Message, stubwire_matching::Request,
    tracing::debug, uuid::Uuid,
};

use crate::{
    Error, Result,
    types::{ChannelLifecycle, ChannelType},
};

// ── Traits ──────────────────────────────────────────────────────────────────

/// Delivery capability supplied by the transport that owns a connection.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    async fn send(&self, message: &Message) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Close the underlying connection. Must not block.
    fn close(&self);
}

/// A live, typed conduit messages can be sent on.
#[async_trait]
pub trait MessageChannel: Send + Sync + fmt::Debug {
    fn id(&self) -> Uuid;

    fn channel_type(&self) -> ChannelType;

    fn is_open(&self) -> bool;

    fn close(&self);

    /// The HTTP request that opened the channel, for request-initiated types.
    fn initiating_request(&self) -> Option<&Request> {
        None
    }

    async fn send_message(&self, message: &Message) -> Result<()>;
}

// ── RequestInitiatedMessageChannel ──────────────────────────────────────────

/// Channel opened by an HTTP request (e.g. a WebSocket upgrade).
pub struct RequestInitiatedMessageChannel {
    id: Uuid,
    channel_type: ChannelType,
    request: Request,
    transport: Arc<dyn ChannelTransport>,
    closed: AtomicBool,
}

impl RequestInitiatedMessageChannel {
    pub fn new(
        channel_type: ChannelType,
        request: Request,
        transport: Arc<dyn ChannelTransport>,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), channel_type, request, transport)
    }

    pub fn with_id(
        id: Uuid,
        channel_type: ChannelType,
        request: Request,
        transport: Arc<dyn ChannelTransport>,
    ) -> Self {
        debug_assert_eq!(
            channel_type.lifecycle(),
            ChannelLifecycle::RequestInitiated
        );
        Self {
            id,
            channel_type,
            request,
            transport,
            closed: AtomicBool::new(false),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }
}

impl fmt::Debug for RequestInitiatedMessageChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestInitiatedMessageChannel")
            .field("id", &self.id)
            .field("channel_type", &self.channel_type)
            .field("url", &self.request.url)
            .field("open", &self.is_open())
            .finish()
    }
}

#[async_trait]
impl MessageChannel for RequestInitiatedMessageChannel {
    fn id(&self) -> Uuid {
        self.id
    }

    fn channel_type(&self) -> ChannelType {
        self.channel_type
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && self.transport.is_open()
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!(channel_id = %self.id, "channel already closed");
            return;
        }
        self.transport.close();
    }

    fn initiating_request(&self) -> Option<&Request> {
        Some(&self.request)
    }

    async fn send_message(&self, message: &Message) -> Result<()> {
        if !self.is_open() {
            return Err(Error::closed(self.id));
        }
        self.transport.send(message).await
    }
}

// ── InMemoryTransport ───────────────────────────────────────────────────────

/// Loopback transport that records what it is sent.
#[derive(Debug)]
pub struct InMemoryTransport {
    sent: Mutex<Vec<Message>>,
    open: AtomicBool,
    close_calls: AtomicUsize,
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            open: AtomicBool::new(true),
            close_calls: AtomicUsize::new(0),
        }
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn sent_text(&self) -> Vec<String> {
        self.sent()
            .iter()
            .map(|m| m.body_as_string().unwrap_or_default())
            .collect()
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::Acquire)
    }

    /// Mark the remote side as gone without going through `close`.
    pub fn disconnect(&self) {
        self.open.store(false, Ordering::Release);
    }
}

#[async_trait]
impl ChannelTransport for InMemoryTransport {
    async fn send(&self, message: &Message) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.clone());
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::AcqRel);
        self.open.store(false, Ordering::Release);
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn channel(url: &str) -> (Arc<InMemoryTransport>, RequestInitiatedMessageChannel) {
        let transport = Arc::new(InMemoryTransport::new());
        let channel = RequestInitiatedMessageChannel::new(
            ChannelType::Websocket,
            Request::get(url),
            Arc::clone(&transport) as Arc<dyn ChannelTransport>,
        );
        (transport, channel)
    }

    #[tokio::test]
    async fn sends_through_transport() {
        let (transport, channel) = channel("/ws");
        channel.send_message(&Message::text("hi")).await.unwrap();
        assert_eq!(transport.sent_text(), vec!["hi".to_string()]);
        assert_eq!(channel.initiating_request().unwrap().url, "/ws");
    }

    #[tokio::test]
    async fn closed_channel_rejects_sends() {
        let (transport, channel) = channel("/ws");
        channel.close();
        channel.close();
        assert_eq!(transport.close_calls(), 1);
        assert!(!channel.is_open());
        let err = channel.send_message(&Message::text("late")).await.unwrap_err();
        assert!(matches!(err, Error::ChannelClosed { channel_id } if channel_id == channel.id()));
    }

    #[test]
    fn remote_disconnect_reads_as_closed() {
        let (transport, channel) = channel("/ws");
        assert!(channel.is_open());
        transport.disconnect();
        assert!(!channel.is_open());
    }
}
