use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Condvar, Mutex, MutexGuard},
    time::{Duration, Instant},
};

use {
    stubwire_matching::{CustomMatchers, DefaultRequestMatcher, RequestMatcher},
    stubwire_messaging::{MessagePattern, MessageServeEvent},
    tracing::debug,
    uuid::Uuid,
};

#[cfg(feature = "metrics")]
use stubwire_metrics::{counter, gauge, journal as journal_metrics};

use crate::{MessageJournal, Result};

/// A thread blocked in `wait_for_events`. Appends push matching events
/// straight into `seen`, so an event evicted before the waiter wakes is
/// still delivered. Explicit removal and reset take events back out.
struct Waiter {
    pattern: MessagePattern,
    seen: Vec<Arc<MessageServeEvent>>,
}

struct JournalState {
    events: VecDeque<Arc<MessageServeEvent>>,
    max_entries: Option<usize>,
    waiters: HashMap<u64, Waiter>,
    next_waiter: u64,
}

impl JournalState {
    /// Drop the oldest events until the limit holds. Returns how many went.
    fn evict(&mut self) -> usize {
        let Some(max) = self.max_entries else {
            return 0;
        };
        let excess = self.events.len().saturating_sub(max);
        self.events.drain(..excess);
        excess
    }

    /// Drop removed events from every pending waiter's results.
    fn forget(&mut self, removed: impl Fn(&MessageServeEvent) -> bool) {
        for waiter in self.waiters.values_mut() {
            waiter.seen.retain(|e| !removed(e.as_ref()));
        }
    }
}

/// Bounded in-memory journal.
///
/// A single mutex orders appends, evictions and waiter registration; a
/// condition variable wakes blocked waiters after each matching append.
pub struct InMemoryMessageJournal {
    state: Mutex<JournalState>,
    appended: Condvar,
    initial_max_entries: Option<usize>,
    matcher: Arc<dyn RequestMatcher>,
    custom: CustomMatchers,
}

impl InMemoryMessageJournal {
    pub fn new(max_entries: Option<usize>) -> Self {
        Self::with_matcher(max_entries, Arc::new(DefaultRequestMatcher), CustomMatchers::new())
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn with_matcher(
        max_entries: Option<usize>,
        matcher: Arc<dyn RequestMatcher>,
        custom: CustomMatchers,
    ) -> Self {
        Self {
            state: Mutex::new(JournalState {
                events: VecDeque::new(),
                max_entries,
                waiters: HashMap::new(),
                next_waiter: 0,
            }),
            appended: Condvar::new(),
            initial_max_entries: max_entries,
            matcher,
            custom,
        }
    }

    fn lock(&self) -> MutexGuard<'_, JournalState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn matches(&self, pattern: &MessagePattern, event: &MessageServeEvent) -> bool {
        pattern.is_anything() || pattern.matches_event(event, self.matcher.as_ref(), &self.custom)
    }

    fn matching(
        &self,
        state: &JournalState,
        pattern: &MessagePattern,
    ) -> Vec<Arc<MessageServeEvent>> {
        state
            .events
            .iter()
            .filter(|e| self.matches(pattern, e))
            .cloned()
            .collect()
    }

    fn record_size(&self, _state: &JournalState) {
        #[cfg(feature = "metrics")]
        gauge!(journal_metrics::EVENTS).set(_state.events.len() as f64);
    }
}

impl Default for InMemoryMessageJournal {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Removes a waiter's slot however the wait ends.
struct WaiterSlot<'a> {
    journal: &'a InMemoryMessageJournal,
    id: u64,
}

impl Drop for WaiterSlot<'_> {
    fn drop(&mut self) {
        self.journal.lock().waiters.remove(&self.id);
    }
}

impl MessageJournal for InMemoryMessageJournal {
    fn message_received(&self, event: MessageServeEvent) {
        let event = Arc::new(event);
        let mut state = self.lock();
        state.events.push_back(Arc::clone(&event));
        let evicted = state.evict();
        if evicted > 0 {
            debug!(evicted, "journal limit reached, evicted oldest events");
            #[cfg(feature = "metrics")]
            counter!(journal_metrics::EVICTIONS_TOTAL).increment(evicted as u64);
        }

        let mut woke = false;
        for waiter in state.waiters.values_mut() {
            if self.matches(&waiter.pattern, &event) {
                waiter.seen.push(Arc::clone(&event));
                woke = true;
            }
        }
        self.record_size(&state);
        drop(state);

        if woke {
            self.appended.notify_all();
        }
    }

    fn reset(&self) {
        let mut state = self.lock();
        state.events.clear();
        state.forget(|_| true);
        state.max_entries = self.initial_max_entries;
        self.record_size(&state);
        debug!(max_entries = ?self.initial_max_entries, "journal reset");
    }

    fn set_max_entries(&self, max_entries: Option<usize>) {
        let mut state = self.lock();
        state.max_entries = max_entries;
        state.evict();
        self.record_size(&state);
    }

    fn max_entries(&self) -> Option<usize> {
        self.lock().max_entries
    }

    fn count_events_matching(&self, pattern: &MessagePattern) -> Result<usize> {
        let state = self.lock();
        Ok(state.events.iter().filter(|e| self.matches(pattern, e)).count())
    }

    fn get_events_matching(&self, pattern: &MessagePattern) -> Result<Vec<Arc<MessageServeEvent>>> {
        let state = self.lock();
        Ok(self.matching(&state, pattern))
    }

    fn get_all_message_serve_events(&self) -> Result<Vec<Arc<MessageServeEvent>>> {
        Ok(self.lock().events.iter().cloned().collect())
    }

    fn get_message_serve_event(&self, id: &Uuid) -> Result<Option<Arc<MessageServeEvent>>> {
        Ok(self.lock().events.iter().find(|e| e.id == *id).cloned())
    }

    fn remove_event(&self, id: &Uuid) -> Result<Option<Arc<MessageServeEvent>>> {
        let mut state = self.lock();
        let removed = state
            .events
            .iter()
            .position(|e| e.id == *id)
            .and_then(|index| state.events.remove(index));
        if removed.is_some() {
            state.forget(|e| e.id == *id);
        }
        self.record_size(&state);
        Ok(removed)
    }

    fn remove_events_matching(&self, pattern: &MessagePattern) -> Result<Vec<Arc<MessageServeEvent>>> {
        let mut state = self.lock();
        let (removed, kept): (Vec<_>, Vec<_>) = state
            .events
            .drain(..)
            .partition(|e| self.matches(pattern, e));
        state.events = kept.into();
        let ids: HashSet<Uuid> = removed.iter().map(|e| e.id).collect();
        state.forget(|e| ids.contains(&e.id));
        self.record_size(&state);
        Ok(removed)
    }

    fn wait_for_events(
        &self,
        pattern: &MessagePattern,
        min_count: usize,
        timeout: Duration,
    ) -> Result<Vec<Arc<MessageServeEvent>>> {
        let deadline = Instant::now().checked_add(timeout);

        let id = {
            let mut state = self.lock();
            let existing = self.matching(&state, pattern);
            if existing.len() >= min_count {
                return Ok(existing);
            }
            let id = state.next_waiter;
            state.next_waiter = state.next_waiter.wrapping_add(1);
            state.waiters.insert(id, Waiter {
                pattern: pattern.clone(),
                seen: existing,
            });
            id
        };
        let _slot = WaiterSlot { journal: self, id };

        let mut state = self.lock();
        loop {
            let seen = state.waiters.get(&id).map_or(0, |w| w.seen.len());
            if seen >= min_count {
                break;
            }
            state = match deadline {
                None => self
                    .appended
                    .wait(state)
                    .unwrap_or_else(|e| e.into_inner()),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        debug!(min_count, seen, "journal wait timed out");
                        #[cfg(feature = "metrics")]
                        counter!(journal_metrics::WAIT_TIMEOUTS_TOTAL).increment(1);
                        break;
                    }
                    self.appended
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(|e| e.into_inner())
                        .0
                },
            };
        }
        let found = state
            .waiters
            .get(&id)
            .map(|w| w.seen.clone())
            .unwrap_or_default();
        drop(state);
        Ok(found)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        std::thread,
        stubwire_channels::{
            ChannelPattern, ChannelTransport, ChannelType, InMemoryTransport,
            RequestInitiatedMessageChannel,
        },
        stubwire_entity::Message,
        stubwire_matching::{ContentPattern, Request, RequestPattern},
    };

    fn channel(url: &str) -> RequestInitiatedMessageChannel {
        RequestInitiatedMessageChannel::new(
            ChannelType::Websocket,
            Request::get(url),
            Arc::new(InMemoryTransport::new()) as Arc<dyn ChannelTransport>,
        )
    }

    fn event(text: &str) -> MessageServeEvent {
        MessageServeEvent::received(&channel("/chat"), Message::text(text), None)
    }

    fn body(text: &str) -> MessagePattern {
        MessagePattern::for_body(ContentPattern::equal_to(text))
    }

    fn bodies(events: &[Arc<MessageServeEvent>]) -> Vec<String> {
        events
            .iter()
            .map(|e| e.message.body_as_string().unwrap_or_default())
            .collect()
    }

    #[test]
    fn bounded_journal_keeps_latest_in_order() {
        let journal = InMemoryMessageJournal::new(Some(3));
        for i in 0..7 {
            journal.message_received(event(&i.to_string()));
        }
        assert_eq!(journal.count_events_matching(&MessagePattern::ANYTHING).unwrap(), 3);
        assert_eq!(
            bodies(&journal.get_all_message_serve_events().unwrap()),
            ["4", "5", "6"]
        );
    }

    #[test]
    fn reset_restores_original_limit() {
        let journal = InMemoryMessageJournal::new(Some(2));
        journal.set_max_entries(Some(10));
        for i in 0..5 {
            journal.message_received(event(&i.to_string()));
        }
        assert_eq!(journal.count_events_matching(&MessagePattern::ANYTHING).unwrap(), 5);

        journal.reset();
        assert_eq!(journal.max_entries(), Some(2));
        assert!(journal.get_all_message_serve_events().unwrap().is_empty());

        journal.set_max_entries(None);
        journal.reset();
        assert_eq!(journal.max_entries(), Some(2));
    }

    #[test]
    fn shrinking_the_limit_evicts_immediately() {
        let journal = InMemoryMessageJournal::unbounded();
        for i in 0..4 {
            journal.message_received(event(&i.to_string()));
        }
        journal.set_max_entries(Some(1));
        assert_eq!(bodies(&journal.get_all_message_serve_events().unwrap()), ["3"]);
    }

    #[test]
    fn queries_by_pattern() {
        let journal = InMemoryMessageJournal::unbounded();
        journal.message_received(event("ping"));
        journal.message_received(event("other"));
        journal.message_received(event("ping"));
        journal.message_received(MessageServeEvent::received(
            &channel("/elsewhere"),
            Message::text("ping"),
            None,
        ));

        assert_eq!(journal.count_events_matching(&body("ping")).unwrap(), 3);
        let on_chat = MessagePattern::for_channel(ChannelPattern::for_request(
            RequestPattern::for_url_path("/chat"),
        ))
        .with_body(ContentPattern::equal_to("ping"));
        assert_eq!(journal.get_events_matching(&on_chat).unwrap().len(), 2);

        let first = journal.get_all_message_serve_events().unwrap()[0].clone();
        assert_eq!(journal.get_message_serve_event(&first.id).unwrap().unwrap().id, first.id);
        assert_eq!(journal.remove_event(&first.id).unwrap().unwrap().id, first.id);
        assert!(journal.get_message_serve_event(&first.id).unwrap().is_none());
        assert!(journal.remove_event(&first.id).unwrap().is_none());
    }

    #[test]
    fn remove_matching_returns_exactly_the_removed() {
        let journal = InMemoryMessageJournal::unbounded();
        for text in ["a", "b", "a", "c"] {
            journal.message_received(event(text));
        }
        let removed = journal.remove_events_matching(&body("a")).unwrap();
        assert_eq!(bodies(&removed), ["a", "a"]);

        let remaining = journal.get_all_message_serve_events().unwrap();
        assert_eq!(bodies(&remaining), ["b", "c"]);
        assert!(remaining.iter().all(|e| removed.iter().all(|r| r.id != e.id)));
    }

    #[test]
    fn wait_returns_immediately_when_already_present() {
        let journal = InMemoryMessageJournal::unbounded();
        journal.message_received(event("ping"));
        let started = Instant::now();
        let found = journal
            .wait_for_event(&body("ping"), Duration::from_secs(30))
            .unwrap();
        assert!(found.is_some());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn wait_sees_append_from_another_thread() {
        let journal = Arc::new(InMemoryMessageJournal::unbounded());
        let writer = {
            let journal = Arc::clone(&journal);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                journal.message_received(event("noise"));
                journal.message_received(event("ping"));
            })
        };
        let found = journal
            .wait_for_event(&body("ping"), Duration::from_secs(10))
            .unwrap();
        writer.join().unwrap();
        assert_eq!(found.unwrap().message.body_as_string().as_deref(), Some("ping"));
    }

    #[test]
    fn wait_times_out_with_none() {
        let journal = InMemoryMessageJournal::unbounded();
        journal.message_received(event("other"));
        let started = Instant::now();
        let found = journal
            .wait_for_event(&body("ping"), Duration::from_millis(50))
            .unwrap();
        assert!(found.is_none());
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn wait_for_events_returns_partial_on_timeout() {
        let journal = InMemoryMessageJournal::unbounded();
        journal.message_received(event("ping"));
        let found = journal
            .wait_for_events(&body("ping"), 3, Duration::from_millis(50))
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn wait_for_events_collects_across_appends() {
        let journal = Arc::new(InMemoryMessageJournal::unbounded());
        let writer = {
            let journal = Arc::clone(&journal);
            thread::spawn(move || {
                for _ in 0..3 {
                    thread::sleep(Duration::from_millis(10));
                    journal.message_received(event("tick"));
                }
            })
        };
        let found = journal
            .wait_for_events(&body("tick"), 3, Duration::from_secs(10))
            .unwrap();
        writer.join().unwrap();
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn waiter_sees_event_evicted_before_it_wakes() {
        let journal = Arc::new(InMemoryMessageJournal::new(Some(1)));
        let waiter = {
            let journal = Arc::clone(&journal);
            thread::spawn(move || journal.wait_for_event(&body("ping"), Duration::from_secs(10)))
        };
        // Wait for the waiter to register before flooding the journal.
        while journal.lock().waiters.is_empty() {
            thread::sleep(Duration::from_millis(1));
        }
        journal.message_received(event("ping"));
        for i in 0..10 {
            journal.message_received(event(&i.to_string()));
        }
        let found = waiter.join().unwrap().unwrap();
        assert_eq!(found.unwrap().message.body_as_string().as_deref(), Some("ping"));
        assert!(journal.lock().waiters.is_empty());
    }

    fn registered_waiter(
        journal: &Arc<InMemoryMessageJournal>,
        pattern: MessagePattern,
        min_count: usize,
    ) -> thread::JoinHandle<Result<Vec<Arc<MessageServeEvent>>>> {
        let waiter = {
            let journal = Arc::clone(journal);
            thread::spawn(move || {
                journal.wait_for_events(&pattern, min_count, Duration::from_millis(300))
            })
        };
        while journal.lock().waiters.is_empty() {
            thread::sleep(Duration::from_millis(1));
        }
        waiter
    }

    #[test]
    fn removed_events_are_not_returned_to_waiters() {
        let journal = Arc::new(InMemoryMessageJournal::unbounded());
        let waiter = registered_waiter(&journal, body("ping"), 3);
        journal.message_received(event("ping"));
        journal.message_received(event("ping"));
        let first = journal.get_all_message_serve_events().unwrap()[0].clone();
        journal.remove_event(&first.id).unwrap();

        let found = waiter.join().unwrap().unwrap();
        assert_eq!(found.len(), 1);
        assert_ne!(found[0].id, first.id);

        let waiter = registered_waiter(&journal, MessagePattern::ANYTHING, 5);
        journal.message_received(event("keep"));
        journal.message_received(event("drop"));
        journal.remove_events_matching(&body("drop")).unwrap();
        let found = waiter.join().unwrap().unwrap();
        assert_eq!(bodies(&found), ["ping", "keep"]);
    }

    #[test]
    fn reset_empties_pending_waiter_results() {
        let journal = Arc::new(InMemoryMessageJournal::unbounded());
        let waiter = registered_waiter(&journal, body("ping"), 2);
        journal.message_received(event("ping"));
        journal.reset();
        assert!(waiter.join().unwrap().unwrap().is_empty());
    }

    #[test]
    fn concurrent_appends_are_all_counted() {
        let journal = Arc::new(InMemoryMessageJournal::unbounded());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let journal = Arc::clone(&journal);
                thread::spawn(move || {
                    for _ in 0..100 {
                        journal.message_received(event("x"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(journal.count_events_matching(&body("x")).unwrap(), 400);
    }
}
