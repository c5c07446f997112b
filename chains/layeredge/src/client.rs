use crate::config::LayerEdgeConfig;
use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use core_logic::{
    HttpMethod, HttpResponse, HttpTransport, RequestDescriptor, RetryingExecutor, WalletIdentity,
};
use ethers::signers::{LocalWallet, Signer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const IP_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Base URL of the LayerEdge API; paths are joined with a single `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    base: String,
}

impl ApiEndpoints {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// One wallet bound to one transport.
///
/// Immutable and cheap to clone; every remote operation in [`crate::task`] takes
/// it by reference and builds a fresh request per call.
#[derive(Clone)]
pub struct AccountSession {
    identity: WalletIdentity,
    transport: Arc<dyn HttpTransport>,
    executor: RetryingExecutor,
    endpoints: ApiEndpoints,
    headers: Arc<BTreeMap<String, String>>,
    request_timeout: Duration,
    ip_check_url: String,
}

impl AccountSession {
    pub fn new(
        identity: WalletIdentity,
        transport: Arc<dyn HttpTransport>,
        config: &LayerEdgeConfig,
    ) -> Self {
        Self {
            identity,
            transport,
            executor: RetryingExecutor::new(config.retry),
            endpoints: ApiEndpoints::new(config.api_base_url.clone()),
            headers: Arc::new(config.headers.clone()),
            request_timeout: config.request_timeout(),
            ip_check_url: config.ip_check_url.clone(),
        }
    }

    pub fn address(&self) -> &str {
        &self.identity.address
    }

    pub fn transport_label(&self) -> String {
        self.transport.describe()
    }

    /// EIP-191 personal-message signature as 0x-prefixed hex.
    ///
    /// The key is parsed on every call, so a bad key only fails the operation
    /// that asked for a signature.
    pub async fn sign(&self, message: &str) -> Result<String> {
        let wallet = LocalWallet::from_str(&self.identity.private_key)
            .context("Invalid private key")?;
        let signature = wallet
            .sign_message(message)
            .await
            .context("Failed to sign message")?;
        Ok(format!("0x{}", signature))
    }

    /// Request to `path` carrying the session's static headers and timeout.
    pub fn request(&self, method: HttpMethod, path: &str) -> RequestDescriptor {
        RequestDescriptor::new(method, self.endpoints.url(path), self.transport.clone())
            .with_headers(&self.headers)
            .with_timeout(self.request_timeout)
    }

    pub async fn execute(&self, request: RequestDescriptor) -> Option<HttpResponse> {
        debug!("{} {} via {}", request.method, request.url, self.transport.describe());
        self.executor.execute(&request).await
    }

    pub async fn get(&self, path: &str) -> Option<HttpResponse> {
        self.execute(self.request(HttpMethod::Get, path)).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Option<HttpResponse> {
        self.execute(self.request(HttpMethod::Post, path).with_json(body))
            .await
    }

    /// Public IP as seen through this session's transport.
    pub async fn public_ip(&self) -> String {
        public_ip(&self.transport, &self.ip_check_url).await
    }
}

/// Asks the IP echo service which address `transport` exits from. Single attempt.
pub async fn public_ip(transport: &Arc<dyn HttpTransport>, ip_check_url: &str) -> String {
    let request =
        RequestDescriptor::get(ip_check_url, transport.clone()).with_timeout(IP_CHECK_TIMEOUT);

    match transport.send(&request).await {
        Ok(response) => response
            .field("ip")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| "IP not found".to_string()),
        Err(e) => {
            debug!("IP check failed: {}", e);
            "IP not found".to_string()
        }
    }
}

pub fn timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn timestamp_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
