use crate::client::AccountSession;
use crate::config::{LayerEdgeConfig, TaskKind};
use crate::task::{self, OperationOutcome, OutcomeStatus};
use anyhow::{Context, Result};
use core_logic::{
    HttpTransport, ProxyConfig, ProxyError, ProxyManager, WalletIdentity, WalletLoader,
    WalletStore, WorkerRunner, TASK_RESULT_TARGET,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Builds the transport for a wallet from its (optional) proxy.
pub type TransportFactory = Arc<
    dyn Fn(Option<&ProxyConfig>) -> Result<Arc<dyn HttpTransport>, ProxyError> + Send + Sync,
>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub step: &'static str,
    pub outcome: OperationOutcome,
}

#[derive(Debug, Clone)]
pub struct WalletReport {
    pub index: usize,
    pub address: String,
    pub steps: Vec<StepOutcome>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeTally {
    pub success: usize,
    pub warn: usize,
    pub error: usize,
}

/// Display-only summary of one pass over every wallet.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub wallets: Vec<WalletReport>,
    /// Wallets whose proxy failed or whose task panicked.
    pub skipped: usize,
}

impl CycleReport {
    pub fn tally(&self) -> OutcomeTally {
        let mut tally = OutcomeTally::default();
        for step in self.wallets.iter().flat_map(|w| &w.steps) {
            match step.outcome.status {
                OutcomeStatus::Success => tally.success += 1,
                OutcomeStatus::Warn => tally.warn += 1,
                OutcomeStatus::Error => tally.error += 1,
            }
        }
        tally
    }
}

/// Wallets and raw proxy specs for one cycle.
#[derive(Debug, Default)]
pub struct CampaignInputs {
    pub wallets: Vec<WalletIdentity>,
    pub proxies: Vec<String>,
}

#[derive(Clone)]
pub struct CampaignRunner {
    config: Arc<LayerEdgeConfig>,
    transport_factory: TransportFactory,
}

impl CampaignRunner {
    pub fn new(config: LayerEdgeConfig) -> Self {
        Self::with_transport_factory(config, Arc::new(ProxyManager::build_transport))
    }

    pub fn with_transport_factory(config: LayerEdgeConfig, factory: TransportFactory) -> Self {
        Self {
            config: Arc::new(config),
            transport_factory: factory,
        }
    }

    pub fn config(&self) -> &LayerEdgeConfig {
        &self.config
    }

    /// Reads the wallet store and proxy list. Neither a missing nor a corrupt
    /// wallet file stops the loop; both yield zero wallets.
    pub async fn load_inputs(&self) -> CampaignInputs {
        let store = WalletStore::new(&self.config.wallet_file);
        let wallets = match store.load_wallets().await {
            Ok(wallets) => wallets,
            Err(e) => {
                warn!("Could not load wallets from {}: {:#}", self.config.wallet_file, e);
                Vec::new()
            }
        };
        if wallets.is_empty() {
            warn!("No wallets found in {}", self.config.wallet_file);
        }

        let proxies = ProxyManager::load_proxy_specs(&self.config.proxy_file);
        if proxies.is_empty() {
            warn!("No proxies loaded. Every wallet runs direct.");
        }

        CampaignInputs { wallets, proxies }
    }

    /// Runs every wallet once. Wallet `i` gets `proxies[i % len]`.
    pub async fn run_cycle(&self, inputs: CampaignInputs) -> CycleReport {
        let CampaignInputs { wallets, proxies } = inputs;
        let total = wallets.len();

        let jobs: Vec<_> = wallets
            .into_iter()
            .enumerate()
            .map(|(index, identity)| {
                let runner = self.clone();
                let proxy = ProxyManager::pick_round_robin(&proxies, index).cloned();
                async move { runner.process_wallet(index, identity, proxy).await }
            })
            .collect();

        let results = WorkerRunner::run_jobs(self.config.scheduling_mode, jobs).await;

        let mut report = CycleReport::default();
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Some(Ok(wallet)) => report.wallets.push(wallet),
                Some(Err(e)) => {
                    error!("Wallet {}/{} skipped: {:#}", index + 1, total, e);
                    report.skipped += 1;
                }
                None => report.skipped += 1,
            }
        }
        report
    }

    /// Cycles until shutdown. With `once`, returns after the first cycle.
    ///
    /// Shutdown also cuts a running cycle short; wallets still in flight are
    /// dropped without a summary.
    pub async fn run_forever(&self, token: CancellationToken, once: bool) -> Result<()> {
        let mut cycle = 0u64;
        loop {
            cycle += 1;
            info!(target: TASK_RESULT_TARGET, "=== Cycle {} ===", cycle);

            let report = tokio::select! {
                report = async { self.run_cycle(self.load_inputs().await).await } => report,
                _ = token.cancelled() => {
                    warn!("Shutdown requested during cycle {}, abandoning it", cycle);
                    return Ok(());
                }
            };
            log_summary(cycle, &report);

            if once {
                return Ok(());
            }

            let interval = self.config.cycle_interval();
            info!(
                target: TASK_RESULT_TARGET,
                "Cycle {} complete. Next run in {}",
                cycle,
                format_interval(interval)
            );
            if !WorkerRunner::sleep_or_shutdown(interval, &token).await {
                info!("Shutdown requested, leaving the campaign loop");
                return Ok(());
            }
        }
    }

    async fn process_wallet(
        self,
        index: usize,
        identity: WalletIdentity,
        proxy_spec: Option<String>,
    ) -> Result<WalletReport> {
        let tag = format!("{:03}", index + 1);

        let proxy = match proxy_spec.as_deref() {
            Some(spec) => {
                let proxy = ProxyManager::parse(spec)
                    .with_context(|| format!("[{}] bad proxy entry", tag))?;
                Some(if self.config.rotate_sessions {
                    proxy.with_session_id(ProxyManager::generate_session_id(
                        ProxyManager::SESSION_ID_LEN,
                    ))
                } else {
                    proxy
                })
            }
            None => None,
        };

        let transport = (self.transport_factory)(proxy.as_ref())
            .with_context(|| format!("[{}] failed to build transport", tag))?;
        let session = AccountSession::new(identity, transport, &self.config);

        info!(
            target: TASK_RESULT_TARGET,
            "[{}] Wallet {} via {}",
            tag,
            session.address(),
            session.transport_label()
        );
        if self.config.show_public_ip {
            let ip = session.public_ip().await;
            info!(target: TASK_RESULT_TARGET, "[{}] IP: {}", tag, ip);
        }

        let steps =
            run_task_sequence(&session, &self.config.task_set, self.config.proof_deadline(), &tag)
                .await;

        Ok(WalletReport {
            index,
            address: session.address().to_string(),
            steps,
        })
    }
}

/// Runs the selected steps in their fixed order. Every step runs regardless of
/// how the previous one ended.
pub async fn run_task_sequence(
    session: &AccountSession,
    task_set: &[TaskKind],
    proof_deadline: Option<Duration>,
    tag: &str,
) -> Vec<StepOutcome> {
    let mut steps = Vec::new();
    let mut record = |step: &'static str, outcome: OperationOutcome| {
        info!(target: TASK_RESULT_TARGET, "[{}] {}: {}", tag, step, outcome);
        steps.push(StepOutcome { step, outcome });
    };

    for kind in TaskKind::ALL.into_iter().filter(|k| task_set.contains(k)) {
        match kind {
            TaskKind::CheckIn => record("Check-in", task::daily_check_in(session).await),
            TaskKind::SubmitProof => {
                let s = session.clone();
                let outcome = with_soft_deadline(
                    async move { task::submit_proof(&s).await },
                    proof_deadline,
                    "Submitting proof timed out",
                )
                .await;
                record("Submit proof", outcome);
            }
            TaskKind::ClaimProofPoints => {
                let s = session.clone();
                let outcome = with_soft_deadline(
                    async move { task::claim_proof_points(&s).await },
                    proof_deadline,
                    "Claiming proof points timed out",
                )
                .await;
                record("Proof points", outcome);
            }
            TaskKind::NodeCycle => {
                let status = task::check_node_status(session).await;
                let running = status.is_success();
                record("Node status", status);
                if running {
                    record("Stop node", task::stop_node(session).await);
                }
                record("Connect node", task::connect_node(session).await);
            }
            TaskKind::ClaimLightNodePoints => {
                record("Light node points", task::claim_light_node_points(session).await)
            }
            TaskKind::CheckPoints => record("Total points", task::check_node_points(session).await),
        }
    }

    steps
}

/// Races `operation` against `deadline`.
///
/// The operation runs as its own task. When the deadline wins, the handle is
/// dropped and the task keeps running detached; its result is discarded.
pub async fn with_soft_deadline<F>(
    operation: F,
    deadline: Option<Duration>,
    timeout_message: &str,
) -> OperationOutcome
where
    F: Future<Output = OperationOutcome> + Send + 'static,
{
    let Some(deadline) = deadline else {
        return operation.await;
    };

    let handle = tokio::spawn(operation);
    match tokio::time::timeout(deadline, handle).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => OperationOutcome::error(format!("Task aborted: {}", e)),
        Err(_) => OperationOutcome::error(timeout_message),
    }
}

fn log_summary(cycle: u64, report: &CycleReport) {
    let tally = report.tally();
    info!(
        target: TASK_RESULT_TARGET,
        "Cycle {} summary: {} wallets | SUCCESS {} | WARN {} | FAILED {} | skipped {}",
        cycle,
        report.wallets.len(),
        tally.success,
        tally.warn,
        tally.error,
        report.skipped
    );
}

fn format_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    match (secs / 3600, (secs % 3600) / 60, secs % 60) {
        (0, 0, s) => format!("{}s", s),
        (0, m, s) => format!("{}m {}s", m, s),
        (h, m, _) => format!("{}h {}m", h, m),
    }
}
