#![allow(dead_code)]

use async_trait::async_trait;
use core_logic::{
    HttpResponse, HttpTransport, NetworkError, RequestDescriptor, RetryConfig, WalletIdentity,
};
use layeredge_project::LayerEdgeConfig;
use serde_json::Value;
use std::io;
use std::sync::{Arc, Mutex};

pub const API: &str = "https://api.test/api";

#[derive(Clone)]
pub enum Reply {
    Json(u16, Value),
    /// Connection-level failure on every attempt.
    Down,
    /// Never answers.
    Hang,
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub url: String,
    pub body: Option<Value>,
    pub headers: std::collections::BTreeMap<String, String>,
}

/// Answers by the first route whose fragment is contained in the URL.
/// Unrouted URLs get an empty 404.
#[derive(Default)]
pub struct RoutedTransport {
    routes: Vec<(String, Reply)>,
    calls: Mutex<Vec<Recorded>>,
}

impl RoutedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, fragment: &str, reply: Reply) -> Self {
        self.routes.push((fragment.to_string(), reply));
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    /// Request paths relative to the API base, in call order.
    pub fn paths(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|c| c.url.trim_start_matches(API).trim_start_matches('/').to_string())
            .collect()
    }
}

#[async_trait]
impl HttpTransport for RoutedTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<HttpResponse, NetworkError> {
        self.calls.lock().unwrap().push(Recorded {
            url: request.url.clone(),
            body: request.body.clone(),
            headers: request.effective_headers(),
        });

        let reply = self
            .routes
            .iter()
            .find(|(fragment, _)| request.url.contains(fragment.as_str()))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(Reply::Json(status, body)) => Ok(HttpResponse::json(status, body)),
            Some(Reply::Down) => Err(NetworkError::Connection {
                endpoint: request.url.clone(),
                reason: "connection refused".to_string(),
            }),
            Some(Reply::Hang) => std::future::pending().await,
            None => Ok(HttpResponse::new(404, None)),
        }
    }

    fn describe(&self) -> String {
        "stub".to_string()
    }
}

/// Config pointed at the stub API with millisecond retries.
pub fn test_config() -> LayerEdgeConfig {
    LayerEdgeConfig {
        api_base_url: API.to_string(),
        ip_check_url: "https://ip.test".to_string(),
        show_public_ip: false,
        rotate_sessions: false,
        retry: RetryConfig::new(2, 1).with_fixed_delay(1),
        ..Default::default()
    }
}

pub fn wallet() -> WalletIdentity {
    WalletIdentity::generate().unwrap()
}

pub fn broken_wallet() -> WalletIdentity {
    WalletIdentity {
        address: "0x00000000000000000000000000000000000000aa".to_string(),
        private_key: "0xnot-a-key".to_string(),
        mnemonic: "unused".to_string(),
    }
}

/// Formatted log output of the current thread's subscriber.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Routes this thread's events into a buffer until the guard drops.
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_target(true)
        .with_writer(move || writer.clone())
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}
