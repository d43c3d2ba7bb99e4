use bulk_log_appender::buffer::{Batch, SealReason};
use bulk_log_appender::document::IndexDocument;
use bulk_log_appender::sender::{
    BulkHttpTransport, ConnectionError, ErrorReporter, HttpTransportConfig, SubmissionError,
    SubmitCallback, Transport,
};
use bulk_log_appender::{BatchConfig, SubmissionEngine};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, header, method, path},
};

fn transport_for(server: &MockServer) -> BulkHttpTransport {
    BulkHttpTransport::new(HttpTransportConfig {
        endpoint: server.uri(),
        request_timeout: Duration::from_secs(5),
        connection_timeout: Duration::from_secs(2),
        ..Default::default()
    })
    .unwrap()
}

async fn mount_root(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tagline": "You Know, for Search" })))
        .mount(server)
        .await;
}

fn batch(messages: &[&str]) -> Batch<IndexDocument> {
    let documents = messages
        .iter()
        .map(|message| IndexDocument {
            index: "logs-2024.01.01".to_string(),
            doc_type: None,
            source: json!({ "message": message }),
        })
        .collect();
    Batch::new(documents, SealReason::SizeBased, 0)
}

fn channel_reporter() -> (Arc<dyn ErrorReporter>, mpsc::UnboundedReceiver<SubmissionError>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let reporter = move |error: &SubmissionError| {
        let _ = tx.send(error.clone());
    };
    (Arc::new(reporter), rx)
}

async fn next_error(rx: &mut mpsc::UnboundedReceiver<SubmissionError>) -> SubmissionError {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("error reported in time")
        .expect("reporter channel open")
}

#[tokio::test]
async fn test_start_probes_endpoint_root() {
    let server = MockServer::start().await;
    mount_root(&server).await;

    let transport = transport_for(&server);
    transport.start().await.unwrap();
    assert!(transport.is_started());

    transport.stop().await.unwrap();
    assert!(!transport.is_started());
}

#[tokio::test]
async fn test_start_fails_on_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    let result = transport.start().await;
    assert!(matches!(result, Err(ConnectionError::Rejected { status: 503 })));
    assert!(!transport.is_started());
}

#[tokio::test]
async fn test_start_fails_when_unreachable() {
    let transport = BulkHttpTransport::new(HttpTransportConfig {
        endpoint: "http://127.0.0.1:1".to_string(),
        connection_timeout: Duration::from_millis(200),
        request_timeout: Duration::from_millis(500),
        ..Default::default()
    })
    .unwrap();

    assert!(matches!(
        transport.start().await,
        Err(ConnectionError::Unreachable(_))
    ));
}

#[tokio::test]
async fn test_successful_bulk_submission_reports_nothing() {
    let server = MockServer::start().await;
    mount_root(&server).await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .and(header("content-type", "application/x-ndjson"))
        .and(body_string_contains(r#"{"index":{"_index":"logs-2024.01.01"}}"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "took": 3,
            "errors": false,
            "items": [{ "index": { "status": 201 } }, { "index": { "status": 201 } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    transport.start().await.unwrap();

    let (reporter, mut rx) = channel_reporter();
    let batch = batch(&["first", "second"]);
    let callback = SubmitCallback::new(batch.id(), batch.len(), reporter);
    transport.submit_async(batch, callback);

    assert_eq!(transport.in_flight(), 1);
    tokio::time::timeout(Duration::from_secs(5), async {
        while transport.in_flight() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("bulk request completed");

    assert!(rx.try_recv().is_err(), "no error reported");
    server.verify().await;
}

#[tokio::test]
async fn test_rejected_bulk_request_reported() {
    let server = MockServer::start().await;
    mount_root(&server).await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(400).set_body_string("illegal_argument_exception"))
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    transport.start().await.unwrap();

    let (reporter, mut rx) = channel_reporter();
    let batch = batch(&["bad"]);
    let batch_id = batch.id().to_string();
    transport.submit_async(batch, SubmitCallback::new(batch_id.clone(), 1, reporter));

    match next_error(&mut rx).await {
        SubmissionError::Rejected {
            batch_id: reported_id,
            status,
            body,
        } => {
            assert_eq!(reported_id, batch_id);
            assert_eq!(status, 400);
            assert_eq!(body, "illegal_argument_exception");
        }
        other => panic!("Expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_item_level_errors_reported_as_partial_failure() {
    let server = MockServer::start().await;
    mount_root(&server).await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "took": 5,
            "errors": true,
            "items": [
                { "index": { "status": 201 } },
                { "index": { "status": 400, "error": { "type": "mapper_parsing_exception" } } },
                { "index": { "status": 429, "error": { "type": "es_rejected_execution_exception" } } }
            ]
        })))
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    transport.start().await.unwrap();

    let (reporter, mut rx) = channel_reporter();
    let batch = batch(&["a", "b", "c"]);
    let callback = SubmitCallback::new(batch.id(), batch.len(), reporter);
    transport.submit_async(batch, callback);

    assert!(matches!(
        next_error(&mut rx).await,
        SubmissionError::PartialFailure {
            failed: 2,
            total: 3,
            ..
        }
    ));
}

#[tokio::test]
async fn test_submit_while_stopped_fails_callback() {
    let server = MockServer::start().await;
    let transport = transport_for(&server);

    let (reporter, mut rx) = channel_reporter();
    let batch = batch(&["late"]);
    let callback = SubmitCallback::new(batch.id(), batch.len(), reporter);
    transport.submit_async(batch, callback);

    assert!(matches!(
        next_error(&mut rx).await,
        SubmissionError::TransportStopped { .. }
    ));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_stop_waits_for_running_bulk_request() {
    let server = MockServer::start().await;
    mount_root(&server).await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "took": 1, "errors": false, "items": [] }))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport_for(&server);
    transport.start().await.unwrap();

    let (reporter, mut rx) = channel_reporter();
    let batch = batch(&["slow"]);
    let callback = SubmitCallback::new(batch.id(), batch.len(), reporter);
    transport.submit_async(batch, callback);
    assert_eq!(transport.in_flight(), 1);

    transport.stop().await.unwrap();
    assert_eq!(transport.in_flight(), 0);
    assert!(rx.try_recv().is_err(), "no error reported");
    server.verify().await;
}

#[tokio::test]
async fn test_engine_stop_delivers_final_batch() {
    let server = MockServer::start().await;
    mount_root(&server).await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "took": 1, "errors": false, "items": [] }))
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;

    let (reporter, mut rx) = channel_reporter();
    let engine = SubmissionEngine::builder(BatchConfig::new(100, 60_000), transport_for(&server))
        .error_reporter(reporter)
        .build();
    engine.start().await.unwrap();

    for message in ["one", "two", "three", "four", "five"] {
        engine
            .submit(IndexDocument {
                index: "logs-2024.01.01".to_string(),
                doc_type: None,
                source: json!({ "message": message }),
            })
            .unwrap();
    }
    engine.stop().await.unwrap();

    // Settled by the time stop returns, nothing left to poll for
    assert_eq!(engine.transport().in_flight(), 0);
    assert!(rx.try_recv().is_err(), "no error reported");

    let bulk: Vec<_> = server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == "/_bulk")
        .collect();
    assert_eq!(bulk.len(), 1);
    assert_eq!(String::from_utf8_lossy(&bulk[0].body).lines().count(), 10);
}
