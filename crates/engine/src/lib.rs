//! Message stub engine.
//!
//! Ties channels, stub mappings and the journal together: inbound channel
//! messages and matched HTTP requests are turned into the actions of the
//! stubs they trigger.

pub mod context;
pub mod engine;
pub mod error;
pub mod handler;

pub use {
    context::{MessageActionContext, TriggerSource},
    engine::{MessagingEngine, MessagingEngineBuilder},
    error::{Error, Result},
    handler::{HttpMatchEvent, HttpStubServeEventListener, MessageStubRequestHandler},
};
