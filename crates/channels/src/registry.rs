use std::sync::Arc;

use {
    dashmap::DashMap,
    stubwire_matching::{CustomMatchers, DefaultRequestMatcher, RequestMatcher, RequestPattern},
    tracing::{debug, info},
    uuid::Uuid,
};

#[cfg(feature = "metrics")]
use stubwire_metrics::{channels as ch_metrics, counter, gauge, labels};

use crate::{channel::MessageChannel, pattern::ChannelTarget, types::ChannelType};

/// Registry of live message channels.
///
/// The registry owns every channel it holds: `remove` and `clear` close a
/// channel before forgetting it.
pub struct MessageChannels {
    channels: DashMap<Uuid, Arc<dyn MessageChannel>>,
    matcher: Arc<dyn RequestMatcher>,
}

impl Default for MessageChannels {
    fn default() -> Self {
        Self::new(Arc::new(DefaultRequestMatcher))
    }
}

impl MessageChannels {
    pub fn new(matcher: Arc<dyn RequestMatcher>) -> Self {
        Self {
            channels: DashMap::new(),
            matcher,
        }
    }

    pub fn matcher(&self) -> &Arc<dyn RequestMatcher> {
        &self.matcher
    }

    pub fn add(&self, channel: Arc<dyn MessageChannel>) {
        let id = channel.id();
        debug!(channel_id = %id, channel_type = %channel.channel_type(), "channel added");
        #[cfg(feature = "metrics")]
        counter!(ch_metrics::OPENED_TOTAL, labels::CHANNEL_TYPE => channel.channel_type().as_str())
            .increment(1);
        if let Some(previous) = self.channels.insert(id, channel) {
            previous.close();
        }
        self.record_active();
    }

    /// Close and forget a channel. Returns the removed channel, if any.
    pub fn remove(&self, id: &Uuid) -> Option<Arc<dyn MessageChannel>> {
        let (_, channel) = self.channels.remove(id)?;
        channel.close();
        debug!(channel_id = %id, "channel removed");
        #[cfg(feature = "metrics")]
        counter!(ch_metrics::CLOSED_TOTAL, labels::CHANNEL_TYPE => channel.channel_type().as_str())
            .increment(1);
        self.record_active();
        Some(channel)
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<dyn MessageChannel>> {
        self.channels.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn get_all(&self) -> Vec<Arc<dyn MessageChannel>> {
        self.channels
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn get_all_open(&self) -> Vec<Arc<dyn MessageChannel>> {
        self.channels
            .iter()
            .filter(|entry| entry.value().is_open())
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn open_count(&self) -> usize {
        self.channels.iter().filter(|e| e.value().is_open()).count()
    }

    /// Open channels whose opening request exactly matches `pattern`.
    pub fn find_by_request_pattern(
        &self,
        pattern: &RequestPattern,
        custom: &CustomMatchers,
    ) -> Vec<Arc<dyn MessageChannel>> {
        self.find(None, pattern, custom)
    }

    pub fn find_by_type_and_request_pattern(
        &self,
        channel_type: ChannelType,
        pattern: &RequestPattern,
        custom: &CustomMatchers,
    ) -> Vec<Arc<dyn MessageChannel>> {
        self.find(Some(channel_type), pattern, custom)
    }

    fn find(
        &self,
        channel_type: Option<ChannelType>,
        pattern: &RequestPattern,
        custom: &CustomMatchers,
    ) -> Vec<Arc<dyn MessageChannel>> {
        self.get_all_open()
            .into_iter()
            .filter(|channel| channel_type.is_none_or(|t| channel.channel_type() == t))
            .filter(|channel| {
                channel
                    .initiating_request()
                    .is_some_and(|request| self.matcher.is_exact_match(request, pattern, custom))
            })
            .collect()
    }

    /// Resolve a target to the live channels it names.
    ///
    /// `Originating` yields the originating channel when there is one and
    /// nothing otherwise. An empty result is not an error.
    pub fn resolve_target(
        &self,
        target: &ChannelTarget,
        originating: Option<&Arc<dyn MessageChannel>>,
        custom: &CustomMatchers,
    ) -> Vec<Arc<dyn MessageChannel>> {
        match target {
            ChannelTarget::Originating => originating.into_iter().cloned().collect(),
            ChannelTarget::RequestInitiated {
                channel_type,
                request_pattern,
            } => self.find(*channel_type, request_pattern, custom),
        }
    }

    /// Close every channel, then empty the registry.
    pub fn clear(&self) {
        let ids: Vec<Uuid> = self.channels.iter().map(|e| *e.key()).collect();
        let count = ids.len();
        for id in ids {
            if let Some((_, channel)) = self.channels.remove(&id) {
                channel.close();
            }
        }
        if count > 0 {
            info!(count, "closed all channels");
        }
        self.record_active();
    }

    fn record_active(&self) {
        #[cfg(feature = "metrics")]
        gauge!(ch_metrics::ACTIVE).set(self.channels.len() as f64);
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::channel::{ChannelTransport, InMemoryTransport, RequestInitiatedMessageChannel},
        stubwire_matching::Request,
    };

    fn open(
        registry: &MessageChannels,
        url: &str,
    ) -> (Arc<InMemoryTransport>, Arc<dyn MessageChannel>) {
        let transport = Arc::new(InMemoryTransport::new());
        let channel: Arc<dyn MessageChannel> = Arc::new(RequestInitiatedMessageChannel::new(
            ChannelType::Websocket,
            Request::get(url),
            Arc::clone(&transport) as Arc<dyn ChannelTransport>,
        ));
        registry.add(Arc::clone(&channel));
        (transport, channel)
    }

    #[test]
    fn remove_closes_exactly_once() {
        let registry = MessageChannels::default();
        let (transport, channel) = open(&registry, "/ws");

        assert!(registry.remove(&channel.id()).is_some());
        assert!(registry.remove(&channel.id()).is_none());
        assert_eq!(transport.close_calls(), 1);
        assert!(registry.get(&channel.id()).is_none());
    }

    #[test]
    fn clear_closes_everything() {
        let registry = MessageChannels::default();
        let (a, _) = open(&registry, "/a");
        let (b, _) = open(&registry, "/b");
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!((a.close_calls(), b.close_calls()), (1, 1));
    }

    #[test]
    fn find_considers_open_channels_only() {
        let registry = MessageChannels::default();
        let custom = CustomMatchers::new();
        let (first, _) = open(&registry, "/ws-notify");
        let (_, second) = open(&registry, "/ws-notify?user=b");
        open(&registry, "/elsewhere");

        let pattern = RequestPattern::for_url_path("/ws-notify");
        assert_eq!(registry.find_by_request_pattern(&pattern, &custom).len(), 2);

        first.disconnect();
        let found = registry.find_by_request_pattern(&pattern, &custom);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), second.id());
        assert_eq!(registry.get_all().len(), 3);
        assert_eq!(registry.get_all_open().len(), 2);
        assert_eq!(registry.open_count(), 2);
    }

    #[test]
    fn partial_matches_do_not_count() {
        let registry = MessageChannels::default();
        open(&registry, "/ws-notify");
        let pattern = RequestPattern::for_url_path("/ws-notify").with_method("POST");
        assert!(
            registry
                .find_by_type_and_request_pattern(ChannelType::Websocket, &pattern, &CustomMatchers::new())
                .is_empty()
        );
    }

    #[test]
    fn resolve_targets() {
        let registry = MessageChannels::default();
        let custom = CustomMatchers::new();
        let (_, origin) = open(&registry, "/chat");
        open(&registry, "/ws-notify");

        let originating = registry.resolve_target(&ChannelTarget::Originating, Some(&origin), &custom);
        assert_eq!(originating.len(), 1);
        assert_eq!(originating[0].id(), origin.id());

        assert!(
            registry
                .resolve_target(&ChannelTarget::Originating, None, &custom)
                .is_empty()
        );

        let broadcast = ChannelTarget::request_initiated(RequestPattern::for_url("/ws-notify"));
        assert_eq!(registry.resolve_target(&broadcast, Some(&origin), &custom).len(), 1);
    }

    #[test]
    fn concurrent_add_and_remove() {
        let registry = Arc::new(MessageChannels::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let (_, channel) = open(&registry, &format!("/t{i}"));
                        let _ = registry.get_all();
                        registry.remove(&channel.id());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(registry.is_empty());
    }
}
