//! Message stub mappings.
//!
//! A [`MessageStubMapping`] pairs a [`MessageTrigger`] (an inbound channel
//! message, an HTTP stub being served, or an HTTP request) with the
//! [`MessageAction`]s to run when it fires. [`MessageStubMappings`] holds the
//! mappings and picks which ones fire; [`MessageServeEvent`] records traffic.

pub mod action;
pub mod error;
pub mod event;
pub mod mapping;
pub mod pattern;
pub mod registry;
pub mod transformer;
pub mod trigger;

pub use {
    action::{MessageAction, SendMessageAction},
    error::{Error, Result},
    event::{EventType, MessageServeEvent},
    mapping::{DEFAULT_PRIORITY, MessageStubMapping, MessageStubMappingBuilder},
    pattern::MessagePattern,
    registry::{MessageStubMappings, parse_mappings},
    transformer::{MessageActionTransformer, TransformContext, Transformers},
    trigger::MessageTrigger,
};
