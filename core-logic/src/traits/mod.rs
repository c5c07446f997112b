use crate::error::NetworkError;
use crate::http::{HttpResponse, RequestDescriptor};
use anyhow::Result;
use async_trait::async_trait;

/// Outbound HTTP adapter (direct, HTTP tunnel or SOCKS).
///
/// Implementations return `Ok` for every response that arrives, including 4xx and
/// 5xx; classifying statuses is the executor's job.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor) -> Result<HttpResponse, NetworkError>;

    /// Short label for logs, e.g. `direct` or a redacted proxy URL.
    fn describe(&self) -> String {
        "direct".to_string()
    }
}

#[async_trait]
pub trait WalletLoader: Send + Sync {
    type Wallet;

    /// Load wallets from a source (plain JSON file, etc.)
    async fn load_wallets(&self) -> Result<Vec<Self::Wallet>>;
}
