//! Tests for connect and reconnect lifecycle handling.
//!
//! They cover session registration, the once-per-session connected
//! callback, reconnect callbacks, and degeneration to a plain poll when
//! no callback is registered.

mod common;

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use common::{
    connect_request, counting_hook, harness, poll_request, quick_config, reconnect_request,
};
use longpoll::{
    encoder::JSON_MIME_TYPE,
    hooks::LifecycleHooks,
    request::ConnectionId,
    test_support::RecordingWriter,
    transport::{Outcome, RequestContext},
};
use serde_json::{Value, json};

#[tokio::test(start_paused = true)]
async fn connect_with_nothing_pending_answers_with_empty_timed_out_batch() {
    let h = harness(quick_config());
    let mut writer = RecordingWriter::new();
    let ctx = RequestContext::new(connect_request("c1"), &mut writer);

    let outcome = h.transport.process_request(ctx).await.expect("connect");

    assert_eq!(outcome, Outcome::Handled);
    assert_eq!(writer.content_type(), Some(JSON_MIME_TYPE));
    assert!(writer.is_finished());
    let body: Value = serde_json::from_str(writer.body_str()).expect("valid JSON");
    assert_eq!(body["messages"], json!([]));
    assert_eq!(body["lastMessageId"], "0");
    assert_eq!(body["timedOut"], json!(true));
    assert_eq!(h.registry.register_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn connected_callback_fires_once_per_session() {
    let h = harness(quick_config());
    let connected = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let mut writer = RecordingWriter::new();
        let hooks = LifecycleHooks::new().on_connected(counting_hook(&connected));
        let ctx = RequestContext::new(connect_request("c1"), &mut writer).with_hooks(hooks);
        h.transport.process_request(ctx).await.expect("connect");
    }

    assert_eq!(connected.load(Ordering::SeqCst), 1);
    assert_eq!(h.registry.register_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn distinct_connections_each_get_a_connected_callback() {
    let h = harness(quick_config());
    let connected = Arc::new(AtomicUsize::new(0));

    for name in ["c1", "c2"] {
        let mut writer = RecordingWriter::new();
        let hooks = LifecycleHooks::new().on_connected(counting_hook(&connected));
        let ctx = RequestContext::new(connect_request(name), &mut writer).with_hooks(hooks);
        h.transport.process_request(ctx).await.expect("connect");
    }

    assert_eq!(connected.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn reconnected_callback_fires_on_every_reconnect() {
    let h = harness(quick_config());
    let reconnected = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let mut writer = RecordingWriter::new();
        let hooks = LifecycleHooks::new().on_reconnected(counting_hook(&reconnected));
        let ctx = RequestContext::new(reconnect_request("c1", "0"), &mut writer).with_hooks(hooks);
        h.transport.process_request(ctx).await.expect("reconnect");
    }

    assert_eq!(reconnected.load(Ordering::SeqCst), 2);
}

/// A connect with backlog but no lifecycle callback behaves exactly like a
/// plain poll: liveness registered first, batch delivered, liveness
/// refreshed on send.
#[tokio::test]
async fn connect_without_callback_degenerates_to_poll() {
    let h = harness(quick_config());
    let id = ConnectionId::from("c1");
    h.store.publish(&id, json!("backlog"));

    let mut writer = RecordingWriter::new();
    let ctx = RequestContext::new(connect_request("c1"), &mut writer);
    h.transport.process_request(ctx).await.expect("connect");

    let body: Value = serde_json::from_str(writer.body_str()).expect("valid JSON");
    assert_eq!(body["messages"], json!(["backlog"]));
    assert_eq!(body["lastMessageId"], "1");
    assert_eq!(body["timedOut"], json!(false));
    assert_eq!(h.registry.register_calls(), 1);
    assert_eq!(h.registry.mark_calls(), 1);
}

/// A reconnect without a reconnected callback is a plain poll from the
/// client-supplied id.
#[tokio::test]
async fn reconnect_without_callback_degenerates_to_poll() {
    let h = harness(quick_config());
    let id = ConnectionId::from("c1");
    h.store.publish(&id, json!("one"));
    h.store.publish(&id, json!("two"));

    let mut writer = RecordingWriter::new();
    let ctx = RequestContext::new(reconnect_request("c1", "1"), &mut writer);
    h.transport.process_request(ctx).await.expect("reconnect");

    let body: Value = serde_json::from_str(writer.body_str()).expect("valid JSON");
    assert_eq!(body["messages"], json!(["two"]));
    assert_eq!(body["lastMessageId"], "2");
}

/// Repeated polls keep the same registration; only the first connect is new.
#[tokio::test]
async fn polls_never_re_register_a_known_connection_as_new() {
    let h = harness(quick_config());
    let id = ConnectionId::from("c1");
    h.store.publish(&id, json!("m1"));

    let mut writer = RecordingWriter::new();
    let ctx = RequestContext::new(connect_request("c1"), &mut writer);
    h.transport.process_request(ctx).await.expect("connect");

    h.store.publish(&id, json!("m2"));
    let mut writer = RecordingWriter::new();
    let ctx = RequestContext::new(poll_request("c1", "1"), &mut writer);
    h.transport.process_request(ctx).await.expect("poll");

    let body: Value = serde_json::from_str(writer.body_str()).expect("valid JSON");
    assert_eq!(body["messages"], json!(["m2"]));
    assert_eq!(h.registry.register_calls(), 2);
    assert_eq!(h.registry.mark_calls(), 2);
}
