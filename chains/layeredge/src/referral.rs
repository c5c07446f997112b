use crate::campaign::TransportFactory;
use crate::client::{public_ip, ApiEndpoints};
use crate::config::LayerEdgeConfig;
use anyhow::{bail, Context, Result};
use core_logic::{
    with_retry, HttpTransport, ProxyManager, RequestDescriptor, SchedulingMode, WalletIdentity,
    WalletStore, WorkerRunner, TASK_RESULT_TARGET,
};
use rand::Rng;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Single-shot calls to the referral endpoints. Any non-2xx status is an error.
#[derive(Clone)]
pub struct ReferralClient {
    transport: Arc<dyn HttpTransport>,
    endpoints: ApiEndpoints,
    headers: Arc<BTreeMap<String, String>>,
    timeout: Duration,
}

impl ReferralClient {
    pub fn new(transport: Arc<dyn HttpTransport>, config: &LayerEdgeConfig) -> Self {
        Self {
            transport,
            endpoints: ApiEndpoints::new(config.api_base_url.clone()),
            headers: Arc::new(config.referral_headers.clone()),
            timeout: config.request_timeout(),
        }
    }

    pub async fn verify_referral_code(&self, code: &str) -> Result<Value> {
        self.post("referral/verify-referral-code", json!({ "invite_code": code }))
            .await
            .context("Referral code verification failed")
    }

    pub async fn register_wallet(&self, code: &str, address: &str) -> Result<Value> {
        let path = format!("referral/register-wallet/{}", code);
        self.post(&path, json!({ "walletAddress": address }))
            .await
            .context("Wallet registration failed")
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let request = RequestDescriptor::post(self.endpoints.url(path), self.transport.clone())
            .with_headers(&self.headers)
            .with_json(body)
            .with_timeout(self.timeout);

        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            bail!("HTTP error! Status: {}", response.status);
        }
        Ok(response.body.unwrap_or(Value::Null))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Registered,
    /// Wallet was created and saved, but registration never went through.
    Failed,
    /// No wallet was created (bad proxy or key generation/persist failure).
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReferralSummary {
    pub registered: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ReferralSummary {
    fn record(&mut self, registration: Registration) {
        match registration {
            Registration::Registered => self.registered += 1,
            Registration::Failed => self.failed += 1,
            Registration::Skipped => self.skipped += 1,
        }
    }
}

/// Creates fresh wallets and registers each one under a referral code.
#[derive(Clone)]
pub struct ReferralRunner {
    config: Arc<LayerEdgeConfig>,
    store: Arc<WalletStore>,
    transport_factory: TransportFactory,
}

impl ReferralRunner {
    pub fn new(config: LayerEdgeConfig) -> Self {
        Self::with_transport_factory(config, Arc::new(ProxyManager::build_transport))
    }

    pub fn with_transport_factory(config: LayerEdgeConfig, factory: TransportFactory) -> Self {
        let store = WalletStore::new(&config.wallet_file);
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            transport_factory: factory,
        }
    }

    /// Each wallet is saved before registration starts, so a failed
    /// registration never loses the key.
    pub async fn create_and_register(
        &self,
        code: &str,
        count: usize,
        proxies: &[String],
    ) -> ReferralSummary {
        let mode = self.config.scheduling_mode;
        info!(target: TASK_RESULT_TARGET, "Creating {} wallets ({})", count, mode);

        let jobs: Vec<_> = (0..count)
            .map(|index| {
                let runner = self.clone();
                let code = code.to_string();
                let proxy = ProxyManager::pick_random(proxies).cloned();
                async move {
                    if mode == SchedulingMode::Sequential && index > 0 {
                        runner.pause_between_wallets().await;
                    }
                    runner.register_one(index, count, &code, proxy).await
                }
            })
            .collect();

        let mut summary = ReferralSummary::default();
        for result in WorkerRunner::run_jobs(mode, jobs).await {
            summary.record(result.unwrap_or(Registration::Skipped));
        }

        info!(
            target: TASK_RESULT_TARGET,
            "Referral run complete: SUCCESS {} | FAILED {} | skipped {}",
            summary.registered,
            summary.failed,
            summary.skipped
        );
        summary
    }

    async fn register_one(
        &self,
        index: usize,
        count: usize,
        code: &str,
        proxy_spec: Option<String>,
    ) -> Registration {
        let tag = format!("{}/{}", index + 1, count);

        let proxy = match proxy_spec.as_deref().map(ProxyManager::parse).transpose() {
            Ok(proxy) => proxy,
            Err(e) => {
                error!("[{}] Skipping wallet: {}", tag, e);
                return Registration::Skipped;
            }
        };
        let transport = match (self.transport_factory)(proxy.as_ref()) {
            Ok(transport) => transport,
            Err(e) => {
                error!("[{}] Skipping wallet: {}", tag, e);
                return Registration::Skipped;
            }
        };

        if proxy.is_some() && self.config.show_public_ip {
            let ip = public_ip(&transport, &self.config.ip_check_url).await;
            info!(target: TASK_RESULT_TARGET, "[{}] Using IP: {}", tag, ip);
        }

        let identity = match self.create_wallet().await {
            Ok(identity) => identity,
            Err(e) => {
                error!("[{}] Could not create wallet: {:#}", tag, e);
                return Registration::Skipped;
            }
        };

        let client = ReferralClient::new(transport, &self.config);
        let settings = &self.config.referral;
        let address = identity.address.clone();
        let result = with_retry(
            settings.max_attempts,
            Duration::from_secs(settings.retry_delay_secs),
            &format!("Wallet {}", tag),
            |_| {
                let client = client.clone();
                let address = address.clone();
                async move {
                    client.verify_referral_code(code).await?;
                    client.register_wallet(code, &address).await
                }
            },
        )
        .await;

        match result {
            Ok(_) => {
                info!(target: TASK_RESULT_TARGET, "[{}] SUCCESS registered {}", tag, address);
                Registration::Registered
            }
            Err(e) => {
                warn!(target: TASK_RESULT_TARGET, "[{}] FAILED {}: {:#}", tag, address, e);
                Registration::Failed
            }
        }
    }

    async fn create_wallet(&self) -> Result<WalletIdentity> {
        let identity = WalletIdentity::generate()?;
        self.store.append(&identity).await?;
        Ok(identity)
    }

    async fn pause_between_wallets(&self) {
        let settings = &self.config.referral;
        let secs = rand::thread_rng().gen_range(settings.min_pause_secs..=settings.max_pause_secs);
        info!(target: TASK_RESULT_TARGET, "Waiting {}s before the next wallet", secs);
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }
}
