// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::http::HeaderMap;
use axum::routing::post;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;

use super::*;
use crate::batch::ParseError;
use crate::interceptor::RequestAuthInterceptor;
use crate::provider::{IdentityProvider, SessionTokenKind, TicketResolver};
use crate::test_support::{batch_of, event_with_tickets, RecordingProvider, RecordingResolver};

/// Headers of every request the mock endpoint received.
type Captured = Arc<Mutex<Vec<HeaderMap>>>;

/// Helper: start a mock upload endpoint that answers with `statuses` in
/// order, repeating the last one.
async fn mock_upload_server(statuses: Vec<u16>) -> (SocketAddr, Arc<AtomicU32>, Captured) {
    let call_count = Arc::new(AtomicU32::new(0));
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let statuses = Arc::new(statuses);

    let app = Router::new().route(
        "/upload",
        post({
            let count = Arc::clone(&call_count);
            let captured = Arc::clone(&captured);
            move |headers: HeaderMap, _body: Bytes| {
                let count = Arc::clone(&count);
                let captured = Arc::clone(&captured);
                let statuses = Arc::clone(&statuses);
                async move {
                    let idx = count.fetch_add(1, Ordering::Relaxed) as usize;
                    captured.lock().push(headers);
                    let status = statuses.get(idx).or(statuses.last()).copied().unwrap_or(500);
                    axum::http::StatusCode::from_u16(status)
                        .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    (addr, call_count, captured)
}

fn interceptor(provider: &Arc<RecordingProvider>) -> Arc<RequestAuthInterceptor> {
    let resolver = RecordingResolver::new().with_ticket("t1", "A");
    let interceptor = RequestAuthInterceptor::new(
        Arc::clone(provider) as Arc<dyn IdentityProvider>,
        Arc::new(resolver) as Arc<dyn TicketResolver>,
    );
    interceptor.set_account("alice");
    Arc::new(interceptor)
}

fn pipeline(addr: SocketAddr, step: Arc<dyn UploadStep>) -> UploadPipeline {
    UploadPipeline::new(format!("http://{addr}/upload"), step, Duration::from_secs(5))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn success_on_first_attempt() -> anyhow::Result<()> {
    let (addr, calls, captured) = mock_upload_server(vec![200]).await;
    let provider = Arc::new(RecordingProvider::new().with_account("alice"));
    let pipeline = pipeline(addr, interceptor(&provider));

    let receipt = pipeline.upload(batch_of(&[event_with_tickets(&["t1"])])).await?;

    assert_eq!(receipt, UploadReceipt { status: 200, attempts: 1 });
    assert_eq!(calls.load(Ordering::Relaxed), 1);
    let captured = captured.lock();
    assert_eq!(header(&captured[0], "content-type"), Some(BATCH_CONTENT_TYPE));
    assert_eq!(header(&captured[0], "x-authmsadeviceticket"), Some("msa-alice"));
    assert_eq!(header(&captured[0], "x-authxtoken"), Some("xt-alice"));
    assert_eq!(header(&captured[0], "x-tickets"), Some(r#""t1"="x:A""#));
    Ok(())
}

#[tokio::test]
async fn unauthorized_retries_once_with_fresh_tokens() -> anyhow::Result<()> {
    let (addr, calls, captured) = mock_upload_server(vec![401, 200]).await;
    let provider = Arc::new(RecordingProvider::new().with_account("alice").with_generations());
    let pipeline = pipeline(addr, interceptor(&provider));

    let receipt = pipeline.upload(batch_of(&[event_with_tickets(&["t1"])])).await?;

    assert_eq!(receipt, UploadReceipt { status: 200, attempts: 2 });
    assert_eq!(calls.load(Ordering::Relaxed), 2);
    assert_eq!(provider.call_count(SessionTokenKind::XToken), 2);
    let captured = captured.lock();
    assert_eq!(header(&captured[0], "x-authxtoken"), Some("xt-alice#1"));
    assert_eq!(header(&captured[1], "x-authxtoken"), Some("xt-alice#2"));
    assert_eq!(header(&captured[1], "x-tickets"), Some(r#""t1"="x:A""#));
    Ok(())
}

#[tokio::test]
async fn second_unauthorized_gives_up() {
    let (addr, calls, _) = mock_upload_server(vec![401]).await;
    let provider = Arc::new(RecordingProvider::new().with_account("alice"));
    let pipeline = pipeline(addr, interceptor(&provider));

    let err = pipeline.upload(batch_of(&[])).await.err();

    assert_eq!(err.map(|e| e.code), Some(ErrorCode::Unauthorized));
    assert_eq!(calls.load(Ordering::Relaxed), 2);
    // One lazy fill plus exactly one forced refresh.
    assert_eq!(provider.call_count(SessionTokenKind::MsaDeviceTicket), 2);
}

#[tokio::test]
async fn other_statuses_are_not_retried() {
    let (addr, calls, _) = mock_upload_server(vec![503]).await;
    let provider = Arc::new(RecordingProvider::new().with_account("alice"));
    let pipeline = pipeline(addr, interceptor(&provider));

    let err = pipeline.upload(batch_of(&[])).await.err();

    assert_eq!(err.as_ref().map(|e| e.code), Some(ErrorCode::Rejected));
    assert!(err.is_some_and(|e| e.message.contains("503")));
    assert_eq!(calls.load(Ordering::Relaxed), 1);
    assert!(provider.calls().iter().all(|c| !c.force));
}

#[tokio::test]
async fn malformed_batch_is_never_sent() {
    let (addr, calls, _) = mock_upload_server(vec![200]).await;
    let provider = Arc::new(RecordingProvider::new().with_account("alice"));
    let pipeline = pipeline(addr, interceptor(&provider));

    let err = pipeline.upload(Bytes::from_static(b"{\"ok\":1}\nnot json\n")).await.err();

    assert_eq!(err.as_ref().map(|e| e.code), Some(ErrorCode::Parse));
    assert!(err.is_some_and(|e| e.message.contains("batch record 2")));
    assert_eq!(calls.load(Ordering::Relaxed), 0);
}

/// Step that declines re-authentication.
struct NoReauth;

impl UploadStep for NoReauth {
    fn on_request(&self, _request: &mut UploadRequest) -> Result<(), ParseError> {
        Ok(())
    }
}

#[tokio::test]
async fn declined_reauth_is_unauthorized() {
    let (addr, calls, _) = mock_upload_server(vec![401, 200]).await;
    let pipeline = pipeline(addr, Arc::new(NoReauth));

    let err = pipeline.upload(batch_of(&[])).await.err();

    assert_eq!(err.map(|e| e.code), Some(ErrorCode::Unauthorized));
    assert_eq!(calls.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn unreachable_endpoint_is_transport_error() -> anyhow::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    let pipeline = pipeline(addr, Arc::new(NoReauth));

    let err = pipeline.upload(batch_of(&[])).await.err();

    assert_eq!(err.map(|e| e.code), Some(ErrorCode::Transport));
    Ok(())
}
