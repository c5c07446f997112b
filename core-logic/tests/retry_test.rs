use async_trait::async_trait;
use core_logic::{
    classify, with_retry, FailureClass, HttpResponse, HttpTransport, NetworkError,
    RequestDescriptor, RetryConfig, RetryingExecutor,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Answers with `fail` until call number `succeed_on` (1-based), then 200.
struct ScriptedTransport {
    calls: AtomicUsize,
    sent_at: Mutex<Vec<Instant>>,
    succeed_on: Option<usize>,
    fail: fn() -> Result<HttpResponse, NetworkError>,
}

impl ScriptedTransport {
    fn new(succeed_on: Option<usize>, fail: fn() -> Result<HttpResponse, NetworkError>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            sent_at: Mutex::new(Vec::new()),
            succeed_on,
            fail,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Time between consecutive calls.
    fn gaps(&self) -> Vec<Duration> {
        let sent_at = self.sent_at.lock().unwrap();
        sent_at.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, _request: &RequestDescriptor) -> Result<HttpResponse, NetworkError> {
        self.sent_at.lock().unwrap().push(Instant::now());
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.succeed_on {
            Some(k) if call >= k => Ok(HttpResponse::json(200, json!({ "ok": true, "call": call }))),
            _ => (self.fail)(),
        }
    }
}

fn server_error() -> Result<HttpResponse, NetworkError> {
    Ok(HttpResponse::json(500, json!({ "message": "Internal Server Error" })))
}

fn bad_gateway() -> Result<HttpResponse, NetworkError> {
    Ok(HttpResponse::new(502, None))
}

fn connection_reset() -> Result<HttpResponse, NetworkError> {
    Err(NetworkError::Connection {
        endpoint: "https://example.test".to_string(),
        reason: "connection reset".to_string(),
    })
}

fn request(transport: Arc<ScriptedTransport>) -> RequestDescriptor {
    RequestDescriptor::get("https://example.test/api", transport)
}

#[tokio::test(start_paused = true)]
async fn test_always_500_exhausts_attempts_and_returns_none() {
    let transport = ScriptedTransport::new(None, server_error);
    let config = RetryConfig::new(5, 20).with_fixed_delay(1);
    let executor = RetryingExecutor::new(config);

    let response = executor.execute(&request(transport.clone())).await;

    assert!(response.is_none());
    assert_eq!(transport.calls(), 5);

    // Four waits between five attempts: 20, 30, 45, 67 ms.
    let gaps = transport.gaps();
    assert_eq!(gaps.len(), 4);
    for (i, gap) in gaps.iter().enumerate() {
        let expected = config.server_error_delay(i as u32);
        assert!(
            *gap >= expected && *gap < expected + Duration::from_millis(5),
            "gap {} was {:?}, expected {:?}",
            i,
            gap,
            expected
        );
    }
    assert!(gaps.windows(2).all(|w| w[0] <= w[1]), "{:?}", gaps);
}

#[test]
fn test_server_error_backoff_is_non_decreasing() {
    let config = RetryConfig::default();
    assert_eq!(config.server_error_delay(0), Duration::from_millis(2000));
    assert_eq!(config.server_error_delay(1), Duration::from_millis(3000));
    assert_eq!(config.server_error_delay(2), Duration::from_millis(4500));

    let delays: Vec<Duration> = (0..config.max_attempts)
        .map(|i| config.server_error_delay(i))
        .collect();
    assert!(delays.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_backoff_cap() {
    let config = RetryConfig::new(30, 1000).with_max_backoff(4000);
    assert_eq!(config.server_error_delay(10), Duration::from_millis(4000));
}

#[tokio::test]
async fn test_success_on_attempt_k_stops_retrying() {
    let transport = ScriptedTransport::new(Some(3), server_error);
    let executor = RetryingExecutor::new(RetryConfig::new(10, 1).with_fixed_delay(1));

    let response = executor
        .execute(&request(transport.clone()))
        .await
        .expect("third attempt succeeds");

    assert_eq!(response.status, 200);
    assert_eq!(response.field("call"), Some(&json!(3)));
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn test_network_faults_use_fixed_delay() {
    let transport = ScriptedTransport::new(None, connection_reset);
    let executor = RetryingExecutor::new(RetryConfig::new(3, 10_000).with_fixed_delay(20));

    let start = Instant::now();
    let response = executor.execute(&request(transport.clone())).await;
    let elapsed = start.elapsed();

    assert!(response.is_none());
    assert_eq!(transport.calls(), 3);
    assert!(elapsed >= Duration::from_millis(40));
    // Far below the 10s exponential base: the 500 branch was never taken.
    assert!(elapsed < Duration::from_secs(5));
}

#[tokio::test]
async fn test_client_errors_are_delivered_without_retry() {
    struct Forbidden(AtomicUsize);

    #[async_trait]
    impl HttpTransport for Forbidden {
        async fn send(&self, _request: &RequestDescriptor) -> Result<HttpResponse, NetworkError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::json(403, json!({ "message": "forbidden" })))
        }
    }

    let transport = Arc::new(Forbidden(AtomicUsize::new(0)));
    let executor = RetryingExecutor::new(RetryConfig::new(5, 1));
    let response = executor
        .execute(&RequestDescriptor::post("https://example.test", transport.clone()))
        .await
        .expect("4xx is a delivered response");

    assert_eq!(response.status, 403);
    assert_eq!(response.message(), Some("forbidden"));
    assert_eq!(transport.0.load(Ordering::SeqCst), 1);
}

#[test]
fn test_classification() {
    assert_eq!(classify(&Ok(HttpResponse::new(404, None))), None);
    assert_eq!(classify(&server_error()), Some(FailureClass::ServerError));
    assert!(matches!(classify(&bad_gateway()), Some(FailureClass::Transient(_))));
    assert!(matches!(classify(&connection_reset()), Some(FailureClass::Transient(_))));
}

#[tokio::test]
async fn test_with_retry_success_after_failures() {
    let counter = Arc::new(AtomicUsize::new(0));

    let result: anyhow::Result<u32> =
        with_retry(3, Duration::from_millis(5), "register", |attempt| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if attempt < 3 {
                    Err(anyhow::anyhow!("temporary error"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), 3);
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_with_retry_all_failures() {
    let counter = Arc::new(AtomicUsize::new(0));

    let result: anyhow::Result<()> =
        with_retry(3, Duration::from_millis(5), "register", |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("permanent error"))
            }
        })
        .await;

    let err = result.unwrap_err();
    assert!(format!("{:#}", err).contains("failed after 3 attempts"));
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}
