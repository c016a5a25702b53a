//! Message channels.
//!
//! A channel is a live, typed conduit (today a WebSocket connection) that was
//! opened by an HTTP request. Transports implement [`ChannelTransport`]; the
//! [`MessageChannels`] registry owns the resulting channels and resolves
//! [`ChannelTarget`]s to the channels a message should be sent on.

pub mod channel;
pub mod error;
pub mod pattern;
pub mod registry;
pub mod types;

pub use {
    channel::{
        ChannelTransport, InMemoryTransport, MessageChannel, RequestInitiatedMessageChannel,
    },
    error::{Error, Result},
    pattern::{ChannelPattern, ChannelTarget},
    registry::MessageChannels,
    types::{ChannelLifecycle, ChannelType, Directionality},
};
