use crate::common::{closed_endpoint, init_tracing, MockEndpoint};
use axum::http::StatusCode;
use fp_sampler::assembler::assemble;
use fp_sampler::signals::SignalBundle;
use fp_sampler::{
    Batch, Profile, SessionContext, SubmissionClient, SubmissionOutcome, SubmissionStatus,
};
use std::time::Duration;

fn batch() -> Batch {
    let session = SessionContext::new(Some("D03"), Some("Firefox"));
    let profiles = [
        Profile::new("01", "Europe/Dublin", ["en-GB"]),
        Profile::new("02", "UTC", ["en"]),
    ];
    profiles
        .iter()
        .enumerate()
        .map(|(i, p)| assemble(&session, p, i + 1, &SignalBundle::default()))
        .collect::<Vec<_>>()
        .into()
}

fn client(endpoint: url::Url) -> SubmissionClient {
    SubmissionClient::new(endpoint, Duration::from_secs(5)).expect("should build client")
}

#[tokio::test]
async fn test_success_reports_server_message() {
    init_tracing();
    let endpoint = MockEndpoint::start(StatusCode::OK, r#"{"message":"ok"}"#).await;

    let outcome = client(endpoint.url.clone()).submit(&batch()).await;

    assert_eq!(outcome, SubmissionOutcome::success("ok"));
    let payloads = endpoint.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].as_array().expect("should post a json array").len(), 2);
    assert_eq!(payloads[0][1]["label_type"], "02");
}

#[tokio::test]
async fn test_success_without_message_uses_reason_phrase() {
    let endpoint = MockEndpoint::start(StatusCode::OK, "{}").await;

    let outcome = client(endpoint.url.clone()).submit(&batch()).await;

    assert_eq!(outcome.status, SubmissionStatus::Success);
    assert_eq!(outcome.message, "OK");
}

#[tokio::test]
async fn test_rejection_uses_body_message() {
    let endpoint =
        MockEndpoint::start(StatusCode::INTERNAL_SERVER_ERROR, r#"{"message":"db down"}"#).await;

    let outcome = client(endpoint.url.clone()).submit(&batch()).await;

    assert_eq!(outcome, SubmissionOutcome::error("Server Error (500): db down"));
}

#[tokio::test]
async fn test_rejection_without_json_uses_reason_phrase() {
    let endpoint = MockEndpoint::start(StatusCode::BAD_GATEWAY, "<html>upstream</html>").await;

    let outcome = client(endpoint.url.clone()).submit(&batch()).await;

    assert_eq!(outcome.status, SubmissionStatus::Error);
    assert_eq!(outcome.message, "Server Error (502): Bad Gateway");
}

#[tokio::test]
async fn test_connection_refused_is_a_network_error() {
    let outcome = client(closed_endpoint().await).submit(&batch()).await;

    assert_eq!(outcome.status, SubmissionStatus::Error);
    assert!(
        outcome.message.starts_with("network error: "),
        "unexpected message: {}",
        outcome.message
    );
}

#[tokio::test]
async fn test_stalled_endpoint_times_out_as_network_error() {
    let endpoint = MockEndpoint::start_with_delay(
        StatusCode::OK,
        r#"{"message":"too late"}"#,
        Duration::from_secs(10),
    )
    .await;
    let client = SubmissionClient::new(endpoint.url.clone(), Duration::from_millis(200))
        .expect("should build client");

    let outcome = client.submit(&batch()).await;

    assert_eq!(outcome.status, SubmissionStatus::Error);
    assert!(outcome.message.starts_with("network error: "));
}

#[test]
fn test_outcome_wire_shape() {
    let value = serde_json::to_value(SubmissionOutcome::error("boom")).expect("should serialize outcome");
    assert_eq!(value, serde_json::json!({"status": "error", "message": "boom"}));
}
