//! Message content: what a stub declares and what a channel is sent.
//!
//! An [`EntityDefinition`] is unresolved content (inline text, JSON or bytes,
//! a files-store path, or a key in a named store). The [`EntityResolver`]
//! turns it into a [`Message`] using an optional [`StoreAccess`] capability.
//! Missing content resolves to an empty message, never to an error.

pub mod definition;
pub mod error;
pub mod message;
pub mod resolver;
pub mod store;
pub mod types;

pub use {
    definition::{EntityDefinition, EntityDefinitionBuilder, EntitySource, MessageDefinition},
    error::{Error, Result},
    message::Message,
    resolver::{EntityDefaults, EntityResolver},
    store::{FileSystemStore, InMemoryStore, Store, StoreAccess, StoreValue, Stores},
    types::{Compression, Encoding, Format},
};
