#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use {
    serde_json::json,
    stubwire_channels::{
        ChannelTransport, ChannelType, InMemoryTransport, MessageChannel,
        RequestInitiatedMessageChannel,
    },
    stubwire_config::StubwireConfig,
    stubwire_engine::{HttpMatchEvent, MessagingEngine},
    stubwire_entity::{Message, MessageDefinition},
    stubwire_matching::{ContentPattern, Request},
    stubwire_messaging::{EventType, MessagePattern, MessageStubMapping, parse_mappings},
};

fn engine() -> MessagingEngine {
    MessagingEngine::from_config(StubwireConfig::default()).unwrap()
}

fn connect(engine: &MessagingEngine, url: &str) -> (Arc<InMemoryTransport>, Arc<dyn MessageChannel>) {
    let transport = Arc::new(InMemoryTransport::new());
    let channel: Arc<dyn MessageChannel> = Arc::new(RequestInitiatedMessageChannel::new(
        ChannelType::Websocket,
        Request::get(url),
        Arc::clone(&transport) as Arc<dyn ChannelTransport>,
    ));
    engine.channels().add(Arc::clone(&channel));
    (transport, channel)
}

fn load(engine: &MessagingEngine, value: serde_json::Value) {
    engine
        .stubs()
        .add_all(parse_mappings(&value.to_string()).unwrap());
}

#[tokio::test]
async fn ping_gets_exactly_one_pong() {
    let engine = engine();
    load(
        &engine,
        json!([{
            "name": "ping-pong",
            "trigger": {"type": "message", "message": {"body": {"equalTo": "ping"}}},
            "actions": [{
                "type": "send",
                "message": {"body": "pong"},
                "channelTarget": {"type": "originating"}
            }]
        }]),
    );
    let (transport, channel) = connect(&engine, "/chat");
    let (bystander, _) = connect(&engine, "/chat");

    let fired = engine
        .handler()
        .process_message(&channel, Message::text("ping"))
        .await
        .unwrap();
    assert_eq!(fired.name(), Some("ping-pong"));
    assert_eq!(transport.sent_text(), ["pong"]);
    assert!(bystander.sent().is_empty());

    let received = engine
        .journal()
        .get_events_matching(&MessagePattern::for_body(ContentPattern::equal_to("ping")))
        .unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].event_type, EventType::Received);
    assert!(received[0].was_matched);
    assert_eq!(received[0].stub_id(), Some(fired.id()));
    assert_eq!(received[0].channel_id, channel.id());

    let all = engine.journal().get_all_message_serve_events().unwrap();
    assert_eq!(
        all.iter().map(|e| e.event_type).collect::<Vec<_>>(),
        [EventType::Sent, EventType::Received]
    );
}

#[tokio::test]
async fn non_matching_message_is_only_journaled() {
    let engine = engine();
    load(
        &engine,
        json!({"messageMappings": [{
            "trigger": {"type": "message", "message": {"body": {"equalTo": "ping"}}},
            "actions": [{"type": "send", "message": {"body": "pong"}, "channelTarget": {"type": "originating"}}]
        }]}),
    );
    let (transport, channel) = connect(&engine, "/chat");

    let fired = engine
        .handler()
        .process_message(&channel, Message::text("hello"))
        .await;
    assert!(fired.is_none());
    assert!(transport.sent().is_empty());

    let events = engine.journal().get_all_message_serve_events().unwrap();
    assert_eq!(events.len(), 1);
    assert!(!events[0].was_matched);
    assert!(events[0].stub_mapping.is_none());
}

#[tokio::test]
async fn http_request_broadcasts_to_notify_channels() {
    let engine = engine();
    load(
        &engine,
        json!([{
            "trigger": {"type": "http-request", "requestPattern": {"urlPath": "/api/trigger"}},
            "actions": [{
                "type": "send",
                "message": {"body": "hello"},
                "channelTarget": {"type": "request-initiated", "requestPattern": {"urlPath": "/ws-notify"}}
            }]
        }]),
    );
    let (first, _) = connect(&engine, "/ws-notify");
    let (second, _) = connect(&engine, "/ws-notify?user=2");
    let (elsewhere, _) = connect(&engine, "/ws-chat");

    engine
        .after_http_match(&HttpMatchEvent::new(Request::get("/api/other"), None))
        .await;
    assert!(first.sent().is_empty());

    engine
        .after_http_match(&HttpMatchEvent::new(Request::post("/api/trigger"), None))
        .await;
    assert_eq!(first.sent_text(), ["hello"]);
    assert_eq!(second.sent_text(), ["hello"]);
    assert!(elsewhere.sent().is_empty());

    let events = engine.journal().get_all_message_serve_events().unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.event_type == EventType::Sent));
}

#[tokio::test]
async fn http_stub_trigger_follows_the_served_stub() {
    let engine = engine();
    let served = uuid::Uuid::new_v4();
    load(
        &engine,
        json!([{
            "trigger": {"type": "http-stub", "stubId": served},
            "actions": [{
                "type": "send",
                "message": {"body": "served"},
                "channelTarget": {"type": "request-initiated", "requestPattern": {}}
            }]
        }]),
    );
    let (transport, _) = connect(&engine, "/events");

    engine
        .after_http_match(&HttpMatchEvent::new(Request::get("/a"), Some(uuid::Uuid::new_v4())))
        .await;
    engine
        .after_http_match(&HttpMatchEvent::new(Request::get("/a"), None))
        .await;
    assert!(transport.sent().is_empty());

    engine
        .after_http_match(&HttpMatchEvent::new(Request::get("/a"), Some(served)))
        .await;
    assert_eq!(transport.sent_text(), ["served"]);
}

#[tokio::test]
async fn lowest_priority_number_wins() {
    let engine = engine();
    for (priority, reply) in [(5, "five"), (1, "one"), (3, "three")] {
        engine.add_stub(
            MessageStubMapping::builder()
                .priority(priority)
                .reply(MessageDefinition::text(reply))
                .build(),
        );
    }
    let (transport, channel) = connect(&engine, "/chat");

    engine
        .handler()
        .process_message(&channel, Message::text("anything"))
        .await;
    assert_eq!(transport.sent_text(), ["one"]);
}

#[tokio::test]
async fn waiters_see_events_from_other_tasks() {
    let engine = engine();
    let (_, channel) = connect(&engine, "/chat");
    let journal = Arc::clone(engine.journal());

    let waiter = std::thread::spawn(move || {
        journal.wait_for_events(
            &MessagePattern::for_body(ContentPattern::contains("tick")),
            2,
            Duration::from_secs(5),
        )
    });
    for i in 0..3 {
        engine
            .handler()
            .process_message(&channel, Message::text(format!("tick {i}")))
            .await;
    }
    let seen = waiter.join().unwrap().unwrap();
    assert!(seen.len() >= 2);
}

#[test]
fn mappings_file_loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mappings.json");
    std::fs::write(
        &path,
        json!([
            {"name": "one", "trigger": {"type": "message"}},
            {"name": "two", "priority": 1, "trigger": {"type": "message"}}
        ])
        .to_string(),
    )
    .unwrap();

    let engine = engine();
    assert_eq!(engine.load_mappings_file(&path).unwrap(), 2);
    let sorted = engine.stubs().get_all_sorted_by_priority();
    assert_eq!(sorted[0].name(), Some("two"));

    let missing = dir.path().join("missing.json");
    assert!(matches!(
        engine.load_mappings_file(&missing),
        Err(stubwire_engine::Error::ReadMappings { .. })
    ));
}
