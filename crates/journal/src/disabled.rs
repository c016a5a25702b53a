use std::{sync::Arc, time::Duration};

use {
    stubwire_messaging::{MessagePattern, MessageServeEvent},
    tracing::trace,
    uuid::Uuid,
};

use crate::{Error, MessageJournal, Result};

/// Journal used when journaling is turned off: appends are dropped and
/// queries fail with [`Error::JournalDisabled`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledMessageJournal;

impl MessageJournal for DisabledMessageJournal {
    fn message_received(&self, event: MessageServeEvent) {
        trace!(event_id = %event.id, "journal disabled, dropping event");
    }

    fn reset(&self) {}

    fn set_max_entries(&self, _max_entries: Option<usize>) {}

    fn max_entries(&self) -> Option<usize> {
        None
    }

    fn count_events_matching(&self, _pattern: &MessagePattern) -> Result<usize> {
        Err(Error::JournalDisabled)
    }

    fn get_events_matching(&self, _pattern: &MessagePattern) -> Result<Vec<Arc<MessageServeEvent>>> {
        Err(Error::JournalDisabled)
    }

    fn get_all_message_serve_events(&self) -> Result<Vec<Arc<MessageServeEvent>>> {
        Err(Error::JournalDisabled)
    }

    fn get_message_serve_event(&self, _id: &Uuid) -> Result<Option<Arc<MessageServeEvent>>> {
        Err(Error::JournalDisabled)
    }

    fn remove_event(&self, _id: &Uuid) -> Result<Option<Arc<MessageServeEvent>>> {
        Err(Error::JournalDisabled)
    }

    fn remove_events_matching(&self, _pattern: &MessagePattern) -> Result<Vec<Arc<MessageServeEvent>>> {
        Err(Error::JournalDisabled)
    }

    fn wait_for_events(
        &self,
        _pattern: &MessagePattern,
        _min_count: usize,
        _timeout: Duration,
    ) -> Result<Vec<Arc<MessageServeEvent>>> {
        Err(Error::JournalDisabled)
    }
}
