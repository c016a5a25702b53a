use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use {
    async_trait::async_trait,
    axum::extract::ws::{Message as WsMessage, WebSocket},
    futures::{SinkExt, stream::StreamExt},
    stubwire_channels::{
        ChannelTransport, ChannelType, Error as ChannelError, MessageChannel,
        RequestInitiatedMessageChannel,
    },
    stubwire_entity::Message,
    stubwire_matching::Request,
    tokio::sync::mpsc,
    tracing::{debug, info},
};

#[cfg(feature = "metrics")]
use stubwire_metrics::{counter, gateway as gw_metrics};

use crate::state::GatewayState;

/// Outbound half of a WebSocket connection.
///
/// Frames are queued on an unbounded channel and written by the
/// connection's write loop, so `send` never waits on the socket.
#[derive(Debug)]
pub struct WebSocketTransport {
    tx: mpsc::UnboundedSender<WsMessage>,
    open: AtomicBool,
}

impl WebSocketTransport {
    pub fn new(tx: mpsc::UnboundedSender<WsMessage>) -> Self {
        Self {
            tx,
            open: AtomicBool::new(true),
        }
    }

    /// Mark the peer as gone without sending a close frame.
    pub fn disconnected(&self) {
        self.open.store(false, Ordering::Release);
    }
}

/// Text messages become text frames, binary messages binary frames.
fn to_frame(message: &Message) -> WsMessage {
    if message.is_binary() {
        WsMessage::Binary(message.body().cloned().unwrap_or_default())
    } else {
        WsMessage::Text(message.body_as_string().unwrap_or_default().into())
    }
}

#[async_trait]
impl ChannelTransport for WebSocketTransport {
    async fn send(&self, message: &Message) -> stubwire_channels::Result<()> {
        self.tx
            .send(to_frame(message))
            .map_err(|e| ChannelError::transport("websocket write loop stopped", e))
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            let _ = self.tx.send(WsMessage::Close(None));
        }
    }
}

/// Drive one upgraded WebSocket: register it as a channel, feed inbound
/// frames to the message engine, and unregister it when the peer goes away.
pub async fn handle_connection(socket: WebSocket, state: GatewayState, request: Request) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (client_tx, mut client_rx) = mpsc::unbounded_channel::<WsMessage>();

    let transport = Arc::new(WebSocketTransport::new(client_tx));
    let channel: Arc<dyn MessageChannel> = Arc::new(RequestInitiatedMessageChannel::new(
        ChannelType::Websocket,
        request,
        Arc::clone(&transport) as Arc<dyn ChannelTransport>,
    ));
    let channel_id = channel.id();

    let write_handle = tokio::spawn(async move {
        while let Some(frame) = client_rx.recv().await {
            let closing = matches!(frame, WsMessage::Close(_));
            if ws_tx.send(frame).await.is_err() {
                debug!(channel_id = %channel_id, "ws: write loop closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    let engine = state.engine();
    engine.channels().add(Arc::clone(&channel));
    info!(
        channel_id = %channel_id,
        url = %channel.initiating_request().map(|r| r.url.as_str()).unwrap_or_default(),
        "ws: channel opened"
    );
    #[cfg(feature = "metrics")]
    counter!(gw_metrics::CONNECTIONS_TOTAL).increment(1);

    while let Some(frame) = ws_rx.next().await {
        let message = match frame {
            Ok(WsMessage::Text(text)) => Message::text(text.as_str()),
            Ok(WsMessage::Binary(bytes)) => Message::binary(bytes),
            Ok(WsMessage::Close(_)) => break,
            Ok(WsMessage::Ping(_) | WsMessage::Pong(_)) => continue,
            Err(e) => {
                debug!(channel_id = %channel_id, error = %e, "ws: read failed");
                break;
            },
        };
        engine.handler().process_message(&channel, message).await;
    }

    transport.disconnected();
    engine.channels().remove(&channel_id);
    drop(channel);
    drop(transport);
    if write_handle.await.is_err() {
        debug!(channel_id = %channel_id, "ws: write loop panicked");
    }
    info!(channel_id = %channel_id, "ws: channel closed");
}
