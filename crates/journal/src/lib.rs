//! Journal of observed message traffic.
//!
//! Every inbound message (and every message a stub sends) is recorded as a
//! [`MessageServeEvent`](stubwire_messaging::MessageServeEvent). The journal
//! can be queried by [`MessagePattern`](stubwire_messaging::MessagePattern),
//! and callers can block until matching events arrive.

pub mod disabled;
pub mod error;
pub mod memory;

use std::{sync::Arc, time::Duration};

use {
    stubwire_messaging::{MessagePattern, MessageServeEvent},
    uuid::Uuid,
};

pub use {
    disabled::DisabledMessageJournal,
    error::{Error, Result},
    memory::InMemoryMessageJournal,
};

/// Shared handle to a journal implementation.
pub type SharedJournal = Arc<dyn MessageJournal>;

/// A queryable log of message events.
///
/// Every operation returns immediately except the two `wait_for_*` calls,
/// which block the calling thread until enough matching events exist or the
/// timeout elapses. A timeout is not an error.
pub trait MessageJournal: Send + Sync {
    fn message_received(&self, event: MessageServeEvent);

    /// Drop every event and restore the size limit the journal was built with.
    fn reset(&self);

    /// `None` means unbounded.
    fn set_max_entries(&self, max_entries: Option<usize>);

    fn max_entries(&self) -> Option<usize>;

    fn count_events_matching(&self, pattern: &MessagePattern) -> Result<usize>;

    fn get_events_matching(&self, pattern: &MessagePattern) -> Result<Vec<Arc<MessageServeEvent>>>;

    fn get_all_message_serve_events(&self) -> Result<Vec<Arc<MessageServeEvent>>>;

    fn get_message_serve_event(&self, id: &Uuid) -> Result<Option<Arc<MessageServeEvent>>>;

    fn remove_event(&self, id: &Uuid) -> Result<Option<Arc<MessageServeEvent>>>;

    fn remove_events_matching(&self, pattern: &MessagePattern) -> Result<Vec<Arc<MessageServeEvent>>>;

    /// The first matching event, waiting up to `timeout` for one to arrive.
    fn wait_for_event(
        &self,
        pattern: &MessagePattern,
        timeout: Duration,
    ) -> Result<Option<Arc<MessageServeEvent>>> {
        Ok(self
            .wait_for_events(pattern, 1, timeout)?
            .into_iter()
            .next())
    }

    /// Matching events once at least `min_count` exist, or whatever matched
    /// when the timeout elapsed. Events evicted by the size limit during the
    /// wait are still returned; events removed or reset away are not.
    fn wait_for_events(
        &self,
        pattern: &MessagePattern,
        min_count: usize,
        timeout: Duration,
    ) -> Result<Vec<Arc<MessageServeEvent>>>;
}
