use std::sync::{Arc, RwLock};

use {
    serde::Deserialize,
    stubwire_channels::MessageChannel,
    stubwire_entity::Message,
    stubwire_matching::{CustomMatchers, DefaultRequestMatcher, Request, RequestMatcher},
    tracing::debug,
    uuid::Uuid,
};

use crate::{
    Result,
    error::Context,
    mapping::{DEFAULT_PRIORITY, MessageStubMapping},
};

/// Registry of message stub mappings.
///
/// Mappings are kept in insertion order; priority sorting is stable, so
/// equal priorities resolve to the earlier-added stub.
pub struct MessageStubMappings {
    mappings: RwLock<Vec<Arc<MessageStubMapping>>>,
    default_priority: i32,
    matcher: Arc<dyn RequestMatcher>,
}

impl Default for MessageStubMappings {
    fn default() -> Self {
        Self::new(DEFAULT_PRIORITY, Arc::new(DefaultRequestMatcher))
    }
}

impl MessageStubMappings {
    pub fn new(default_priority: i32, matcher: Arc<dyn RequestMatcher>) -> Self {
        Self {
            mappings: RwLock::new(Vec::new()),
            default_priority,
            matcher,
        }
    }

    pub fn default_priority(&self) -> i32 {
        self.default_priority
    }

    /// Add a mapping, replacing any mapping with the same id in place.
    pub fn add(&self, mapping: MessageStubMapping) -> Arc<MessageStubMapping> {
        let mapping = Arc::new(mapping);
        let mut mappings = self.mappings.write().unwrap_or_else(|e| e.into_inner());
        match mappings.iter_mut().find(|m| m.id() == mapping.id()) {
            Some(existing) => {
                debug!(stub_id = %mapping.id(), "replacing message stub");
                *existing = Arc::clone(&mapping);
            },
            None => {
                debug!(stub_id = %mapping.id(), name = ?mapping.name(), "adding message stub");
                mappings.push(Arc::clone(&mapping));
            },
        }
        mapping
    }

    pub fn add_all(&self, mappings: impl IntoIterator<Item = MessageStubMapping>) -> usize {
        mappings.into_iter().map(|m| self.add(m)).count()
    }

    pub fn remove(&self, id: &Uuid) -> Option<Arc<MessageStubMapping>> {
        let mut mappings = self.mappings.write().unwrap_or_else(|e| e.into_inner());
        let index = mappings.iter().position(|m| m.id() == *id)?;
        Some(mappings.remove(index))
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<MessageStubMapping>> {
        self.read().iter().find(|m| m.id() == *id).cloned()
    }

    pub fn get_all(&self) -> Vec<Arc<MessageStubMapping>> {
        self.read().clone()
    }

    pub fn get_all_sorted_by_priority(&self) -> Vec<Arc<MessageStubMapping>> {
        let mut all = self.get_all();
        all.sort_by_key(|m| m.priority_or(self.default_priority));
        all
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// The highest-priority message-triggered stub matching `message` on
    /// `channel`.
    pub fn find_matching_stub(
        &self,
        channel: &dyn MessageChannel,
        message: &Message,
        custom: &CustomMatchers,
    ) -> Option<Arc<MessageStubMapping>> {
        self.get_all_sorted_by_priority()
            .into_iter()
            .find(|m| m.matches_message(channel, message, self.matcher.as_ref(), custom))
    }

    /// Every HTTP-triggered stub fired by `request`, in priority order.
    pub fn find_http_triggered(
        &self,
        stub_id: Option<Uuid>,
        request: &Request,
        custom: &CustomMatchers,
    ) -> Vec<Arc<MessageStubMapping>> {
        self.get_all_sorted_by_priority()
            .into_iter()
            .filter(|m| {
                m.trigger()
                    .matches_http(stub_id, request, self.matcher.as_ref(), custom)
            })
            .collect()
    }

    pub fn clear(&self) {
        self.mappings
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<MessageStubMapping>>> {
        self.mappings.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Parse a mappings document: an array, `{"messageMappings": [...]}` or a
/// single mapping.
pub fn parse_mappings(json: &str) -> Result<Vec<MessageStubMapping>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let list = match (value.as_array(), value.get("messageMappings")) {
        (Some(list), _) => list.as_slice(),
        (None, Some(serde_json::Value::Array(list))) => list.as_slice(),
        _ => return Ok(vec![MessageStubMapping::deserialize(&value)?]),
    };
    list.iter()
        .enumerate()
        .map(|(index, v)| {
            MessageStubMapping::deserialize(v)
                .with_context(|| format!("invalid message stub mapping at index {index}"))
        })
        .collect()
}
