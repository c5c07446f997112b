use crate::config::SchedulingMode;
use std::future::Future;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Instrument};

pub struct WorkerRunner;

impl WorkerRunner {
    /// Token that trips on Ctrl+C.
    pub fn shutdown_token() -> CancellationToken {
        let token = CancellationToken::new();
        let cloned_token = token.clone();

        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("🛑 Received Ctrl+C. Initiating graceful shutdown...");
                    cloned_token.cancel();
                }
                Err(err) => {
                    error!("Unable to listen for shutdown signal: {}", err);
                }
            }
        });

        token
    }

    /// Runs independent jobs and returns their results in input order.
    ///
    /// Every job gets its own task, so a panic in one is logged and reported as
    /// `None` without touching the others. `Sequential` awaits each job before
    /// spawning the next; `FanOut` spawns all of them up front.
    pub async fn run_jobs<T, Fut>(mode: SchedulingMode, jobs: Vec<Fut>) -> Vec<Option<T>>
    where
        T: Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let total = jobs.len();
        let mut results: Vec<Option<T>> = (0..total).map(|_| None).collect();

        match mode {
            SchedulingMode::Sequential => {
                for (i, job) in jobs.into_iter().enumerate() {
                    let span = tracing::info_span!("worker", worker_id = format!("{:03}", i + 1));
                    match tokio::spawn(job.instrument(span)).await {
                        Ok(value) => results[i] = Some(value),
                        Err(e) => error!("Worker {} panicked or failed to join: {:?}", i + 1, e),
                    }
                }
            }
            SchedulingMode::FanOut => {
                let mut set = JoinSet::new();
                for (i, job) in jobs.into_iter().enumerate() {
                    let span = tracing::info_span!("worker", worker_id = format!("{:03}", i + 1));
                    set.spawn(async move { (i, job.await) }.instrument(span));
                }

                while let Some(res) = set.join_next().await {
                    match res {
                        Ok((i, value)) => results[i] = Some(value),
                        Err(e) => error!("A worker task panicked or failed to join: {:?}", e),
                    }
                }
            }
        }

        results
    }

    /// Sleeps for `duration` unless shutdown is requested first.
    /// Returns `false` when interrupted.
    pub async fn sleep_or_shutdown(duration: Duration, token: &CancellationToken) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = token.cancelled() => false,
        }
    }
}
