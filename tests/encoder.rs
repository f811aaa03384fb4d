//! Tests for response encoding: plain JSON, callback wrapping, the
//! re-poll delay hint, and the one-write-per-request rule.

mod common;

use std::time::Duration;

use common::{harness, quick_config};
use longpoll::{
    encoder::{JSON_MIME_TYPE, JSONP_MIME_TYPE},
    error::TransportError,
    request::{ConnectionId, PollRequest},
    test_support::RecordingWriter,
    transport::RequestContext,
};
use serde_json::{Value, json};

fn jsonp_poll_request(connection: &str, since: &str, callback: &str) -> PollRequest {
    PollRequest::new(ConnectionId::from(connection), "/messaging/poll")
        .with_query_string(&format!("messageId={since}&callback={callback}"))
}

#[tokio::test]
async fn callback_parameter_wraps_the_payload() {
    let h = harness(quick_config());
    let id = ConnectionId::from("c1");
    h.store.publish(&id, json!("m1"));

    let mut writer = RecordingWriter::new();
    let ctx = RequestContext::new(jsonp_poll_request("c1", "0", "foo"), &mut writer);
    h.transport.process_request(ctx).await.expect("poll");

    assert_eq!(writer.content_type(), Some(JSONP_MIME_TYPE));
    let body = writer.body_str();
    assert!(body.starts_with("foo("), "body was {body}");
    assert!(body.ends_with(");"), "body was {body}");
    let inner: Value =
        serde_json::from_str(&body["foo(".len()..body.len() - 2]).expect("wrapped JSON");
    assert_eq!(inner["messages"], json!(["m1"]));
}

#[tokio::test]
async fn plain_requests_get_plain_json() {
    let h = harness(quick_config());
    let id = ConnectionId::from("c1");
    h.store.publish(&id, json!("m1"));

    let mut writer = RecordingWriter::new();
    let ctx = RequestContext::new(
        PollRequest::new(id.clone(), "/messaging/poll").with_query_string("messageId=0"),
        &mut writer,
    );
    h.transport.process_request(ctx).await.expect("poll");

    assert_eq!(writer.content_type(), Some(JSON_MIME_TYPE));
    let body: Value = serde_json::from_str(writer.body_str()).expect("valid JSON");
    assert_eq!(body["messages"], json!(["m1"]));
}

#[tokio::test]
async fn configured_poll_delay_is_attached_to_batches() {
    let config = quick_config().with_poll_delay(Duration::from_millis(2000));
    let h = harness(config);
    let id = ConnectionId::from("c1");
    h.store.publish(&id, json!("m1"));

    let mut writer = RecordingWriter::new();
    let ctx = RequestContext::new(
        PollRequest::new(id, "/messaging/poll").with_query_string("messageId=0"),
        &mut writer,
    );
    h.transport.process_request(ctx).await.expect("poll");

    let body: Value = serde_json::from_str(writer.body_str()).expect("valid JSON");
    assert_eq!(body["LongPollDelay"], json!(2000));
}

#[tokio::test]
async fn zero_poll_delay_adds_no_hint() {
    let h = harness(quick_config());
    let id = ConnectionId::from("c1");
    h.store.publish(&id, json!("m1"));

    let mut writer = RecordingWriter::new();
    let ctx = RequestContext::new(
        PollRequest::new(id, "/messaging/poll").with_query_string("messageId=0"),
        &mut writer,
    );
    h.transport.process_request(ctx).await.expect("poll");

    let body: Value = serde_json::from_str(writer.body_str()).expect("valid JSON");
    assert!(body.get("LongPollDelay").is_none());
}

#[tokio::test]
async fn send_value_writes_arbitrary_payloads() {
    let h = harness(quick_config());
    let mut writer = RecordingWriter::new();

    h.transport
        .send_value(&mut writer, &json!({"status": "ok"}), None)
        .await
        .expect("send value");

    assert_eq!(writer.content_type(), Some(JSON_MIME_TYPE));
    assert_eq!(writer.body_str(), r#"{"status":"ok"}"#);
    assert!(writer.is_finished());
}

#[tokio::test]
async fn send_value_supports_callback_wrapping() {
    let h = harness(quick_config());
    let mut writer = RecordingWriter::new();

    h.transport
        .send_value(&mut writer, &json!(1), Some("cb"))
        .await
        .expect("send value");

    assert_eq!(writer.content_type(), Some(JSONP_MIME_TYPE));
    assert_eq!(writer.body_str(), "cb(1);");
}

/// The body is finalized after the single write; a second send fails
/// rather than appending.
#[tokio::test]
async fn second_write_after_finalization_is_fatal() {
    let h = harness(quick_config());
    let mut writer = RecordingWriter::new();

    h.transport
        .send_value(&mut writer, &json!(1), None)
        .await
        .expect("first send");
    let error = h
        .transport
        .send_value(&mut writer, &json!(2), None)
        .await
        .expect_err("second send must fail");

    assert!(matches!(error, TransportError::Body(_)));
    assert_eq!(writer.body_str(), "1");
}
