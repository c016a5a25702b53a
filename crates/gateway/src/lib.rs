//! Network front end for the message stub engine.
//!
//! Every request path accepts a WebSocket upgrade; the upgraded socket is
//! registered as a request-initiated channel whose initiating request is the
//! upgrade request. Plain HTTP requests are reported to the engine so
//! HTTP-request triggers fire, then answered with 404.

pub mod server;
pub mod state;
pub mod ws;

pub use {
    server::{HEALTH_PATH, METRICS_PATH, build_gateway_app, serve, start_gateway},
    state::GatewayState,
    ws::WebSocketTransport,
};
