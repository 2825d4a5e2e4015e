use super::{Connection, ConnectionId, EventEnvelope, Hub, MENTOR_ELAPSED, QUIZ_ELAPSED};
use crate::config::Settings;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tungstenite::protocol::Message as WsMessage;

fn relay_hub() -> Hub {
    Hub::from_routes(&Settings::default().relay.routes)
}

fn connect(hub: &mut Hub) -> (ConnectionId, UnboundedReceiver<WsMessage>) {
    let (tx, rx) = mpsc::unbounded_channel::<WsMessage>();
    let connection = Connection::new(tx);
    let id = connection.id.clone();
    assert!(hub.on_connect(connection));
    (id, rx)
}

fn recv_envelope(rx: &mut UnboundedReceiver<WsMessage>) -> EventEnvelope {
    match rx.try_recv().expect("expected a queued frame") {
        WsMessage::Text(text) => EventEnvelope::decode(text.as_str()).unwrap(),
        other => panic!("Expected a text message, got {other:?}"),
    }
}

#[test]
fn test_hub_new() {
    let hub = Hub::new();
    assert!(hub.is_empty());
    assert!(!hub.handles(QUIZ_ELAPSED));
}

#[test]
fn test_default_routes_register_quiz_relay() {
    let hub = relay_hub();
    assert!(hub.handles(QUIZ_ELAPSED));
    assert!(!hub.handles(MENTOR_ELAPSED));
}

#[test]
fn test_connect_and_disconnect() {
    let mut hub = relay_hub();
    let (id, _rx) = connect(&mut hub);
    assert!(hub.contains(&id));
    assert_eq!(hub.len(), 1);

    hub.on_disconnect(&id);
    assert!(!hub.contains(&id));
    assert!(hub.is_empty());
}

#[test]
fn test_disconnect_twice_is_noop() {
    let mut hub = relay_hub();
    let (a, _rx_a) = connect(&mut hub);
    let (b, _rx_b) = connect(&mut hub);

    hub.on_disconnect(&a);
    hub.on_disconnect(&a);

    assert_eq!(hub.connection_ids(), vec![b]);
}

#[test]
fn test_disconnect_unknown_id_is_noop() {
    let mut hub = relay_hub();
    let (_id, _rx) = connect(&mut hub);
    hub.on_disconnect(&"conn-missing".to_string());
    assert_eq!(hub.len(), 1);
}

#[test]
fn test_relay_reaches_sender_and_peers() {
    let mut hub = relay_hub();
    let (a, mut rx_a) = connect(&mut hub);
    let (_b, mut rx_b) = connect(&mut hub);

    let delivered = hub.on_event(&a, QUIZ_ELAPSED, &json!({ "elapsed": 42 }));
    assert_eq!(delivered, 2);

    for rx in [&mut rx_a, &mut rx_b] {
        let envelope = recv_envelope(rx);
        assert_eq!(envelope.event, MENTOR_ELAPSED);
        assert_eq!(envelope.data, json!({ "elapsed": 42 }));
    }
}

#[test]
fn test_disconnected_connection_is_excluded() {
    let mut hub = relay_hub();
    let (a, mut rx_a) = connect(&mut hub);
    hub.on_disconnect(&a);

    let (b, mut rx_b) = connect(&mut hub);
    let delivered = hub.on_event(&b, QUIZ_ELAPSED, &json!({ "elapsed": 7 }));
    assert_eq!(delivered, 1);

    let envelope = recv_envelope(&mut rx_b);
    assert_eq!(envelope.event, MENTOR_ELAPSED);
    assert_eq!(envelope.data, json!({ "elapsed": 7 }));
    // The sender half went away with the connection, nothing was queued first.
    assert!(matches!(
        rx_a.try_recv(),
        Err(mpsc::error::TryRecvError::Disconnected)
    ));
}

#[test]
fn test_every_live_connection_gets_exactly_one_copy() {
    let mut hub = relay_hub();
    let mut receivers: Vec<_> = (0..5).map(|_| connect(&mut hub)).collect();
    let sender = receivers[2].0.clone();

    hub.on_event(&sender, QUIZ_ELAPSED, &json!([1, 2, 3]));

    for (_, rx) in receivers.iter_mut() {
        assert_eq!(recv_envelope(rx).data, json!([1, 2, 3]));
        assert!(rx.try_recv().is_err());
    }
}

#[test]
fn test_unrecognized_event_is_ignored() {
    let mut hub = relay_hub();
    let (a, mut rx_a) = connect(&mut hub);
    let (_b, mut rx_b) = connect(&mut hub);

    assert_eq!(hub.on_event(&a, "chat", &json!({ "text": "hi" })), 0);
    // The outbound name is not itself a trigger.
    assert_eq!(hub.on_event(&a, MENTOR_ELAPSED, &json!(1)), 0);

    assert_eq!(hub.len(), 2);
    assert!(rx_a.try_recv().is_err());
    assert!(rx_b.try_recv().is_err());
}

#[test]
fn test_payload_is_forwarded_unmodified() {
    let mut hub = relay_hub();
    let (a, mut rx_a) = connect(&mut hub);
    let payload = json!({
        "elapsed": 12.5,
        "quiz": { "id": 9, "tags": ["tl", null] },
        "done": false
    });

    hub.on_event(&a, QUIZ_ELAPSED, &payload);
    assert_eq!(recv_envelope(&mut rx_a).data, payload);
}

#[test]
fn test_broadcast_to_closed_channel_is_swallowed() {
    let mut hub = Hub::new();
    let (_a, rx_a) = connect(&mut hub);
    let (_b, mut rx_b) = connect(&mut hub);
    drop(rx_a);

    let delivered = hub.broadcast(MENTOR_ELAPSED, &Value::Null);
    assert_eq!(delivered, 1);
    assert_eq!(recv_envelope(&mut rx_b).data, Value::Null);
}

#[test]
fn test_broadcast_with_no_connections() {
    let hub = relay_hub();
    assert_eq!(hub.broadcast(MENTOR_ELAPSED, &json!({})), 0);
}

#[test]
fn test_register_handler_replaces_previous() {
    let mut hub = relay_hub();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    hub.register_handler(
        QUIZ_ELAPSED,
        Box::new(move |_hub: &Hub, _from: &ConnectionId, _payload: &Value| {
            seen.fetch_add(1, Ordering::SeqCst);
            0
        }),
    );
    let (a, mut rx_a) = connect(&mut hub);

    assert_eq!(hub.on_event(&a, QUIZ_ELAPSED, &json!(1)), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(rx_a.try_recv().is_err());
}

#[test]
fn test_custom_route() {
    let mut hub = Hub::new();
    hub.register_relay("ping", "pong");
    let (a, mut rx_a) = connect(&mut hub);

    hub.on_event(&a, "ping", &json!("x"));
    assert_eq!(recv_envelope(&mut rx_a), EventEnvelope::new("pong", json!("x")));
}

#[test]
fn test_close_all_sends_close_and_empties() {
    let mut hub = relay_hub();
    let (_a, mut rx_a) = connect(&mut hub);
    let (_b, mut rx_b) = connect(&mut hub);

    assert_eq!(hub.close_all(), 2);
    assert!(hub.is_empty());

    for rx in [&mut rx_a, &mut rx_b] {
        assert!(matches!(rx.try_recv(), Ok(WsMessage::Close(Some(_)))));
    }
}

#[test]
fn test_connect_after_close_all_is_refused() {
    let mut hub = relay_hub();
    assert!(!hub.is_closing());
    hub.close_all();
    assert!(hub.is_closing());

    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    assert!(!hub.on_connect(Connection::new(tx)));
    assert!(hub.is_empty());
    assert_eq!(hub.broadcast(MENTOR_ELAPSED, &json!({ "elapsed": 1 })), 0);
    assert!(matches!(
        rx.try_recv(),
        Err(mpsc::error::TryRecvError::Disconnected)
    ));
}

#[test]
fn test_connection_is_open_until_receiver_drops() {
    let (tx, rx) = mpsc::unbounded_channel::<WsMessage>();
    let connection = Connection::new(tx);
    assert!(connection.id.starts_with("conn-"));
    assert!(connection.is_open());
    drop(rx);
    assert!(!connection.is_open());
    assert!(!connection.send(WsMessage::text("late")));
}

#[test]
fn test_envelope_missing_data_is_null() {
    let envelope = EventEnvelope::decode(r#"{"event":"quiz_elapsed"}"#).unwrap();
    assert_eq!(envelope.event, QUIZ_ELAPSED);
    assert_eq!(envelope.data, Value::Null);
}
