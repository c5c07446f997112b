use crate::error::NetworkError;
use crate::http::{HttpResponse, RequestDescriptor};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy for remote calls.
///
/// HTTP 500 backs off exponentially (`base_backoff_ms * exponential_base^attempt`);
/// every other failure waits `fixed_delay_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub exponential_base: f64,
    pub fixed_delay_ms: u64,
    /// Upper bound for the exponential branch. `None` leaves it unbounded.
    pub max_backoff_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            base_backoff_ms: 2000,
            exponential_base: 1.5,
            fixed_delay_ms: 2000,
            max_backoff_ms: None,
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, base_backoff_ms: u64) -> Self {
        Self {
            max_attempts,
            base_backoff_ms,
            ..Default::default()
        }
    }

    pub fn with_fixed_delay(mut self, fixed_delay_ms: u64) -> Self {
        self.fixed_delay_ms = fixed_delay_ms;
        self
    }

    pub fn with_max_backoff(mut self, max_backoff_ms: u64) -> Self {
        self.max_backoff_ms = Some(max_backoff_ms);
        self
    }

    /// Wait after a 500 on zero-based attempt `attempt`.
    pub fn server_error_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self.base_backoff_ms as f64 * self.exponential_base.powi(attempt as i32);
        let delay_ms = match self.max_backoff_ms {
            Some(cap) => delay_ms.min(cap as f64),
            None => delay_ms,
        };
        Duration::from_millis(delay_ms as u64)
    }

    pub fn transient_delay(&self) -> Duration {
        Duration::from_millis(self.fixed_delay_ms)
    }
}

/// Why an attempt did not produce a deliverable response.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureClass {
    /// HTTP 500 from the remote.
    ServerError,
    /// Network fault, timeout, or any status above 500.
    Transient(String),
}

/// `None` means the response is handed to the caller as is.
///
/// Statuses below 500 are always delivered, 4xx included: business success is read
/// from the body. Network faults and statuses above 500 all share the fixed-delay
/// branch; they are deliberately not subdivided further.
pub fn classify(result: &Result<HttpResponse, NetworkError>) -> Option<FailureClass> {
    match result {
        Ok(response) if response.status < 500 => None,
        Ok(response) if response.status == 500 => Some(FailureClass::ServerError),
        Ok(response) => Some(FailureClass::Transient(format!("HTTP {}", response.status))),
        Err(e) => Some(FailureClass::Transient(e.to_string())),
    }
}

/// Issues requests through their transport with bounded, classified retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryingExecutor {
    config: RetryConfig,
}

impl RetryingExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Returns the first deliverable response, or `None` once every attempt failed.
    /// Never sleeps after the final attempt.
    pub async fn execute(&self, request: &RequestDescriptor) -> Option<HttpResponse> {
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 0..max_attempts {
            let result = request.transport.send(request).await;
            let failure = match classify(&result) {
                None => {
                    if attempt > 0 {
                        debug!("{} {} succeeded on attempt {}", request.method, request.url, attempt + 1);
                    }
                    return result.ok();
                }
                Some(failure) => failure,
            };

            if attempt + 1 == max_attempts {
                warn!(
                    "{} {} gave up after {} attempts: {:?}",
                    request.method, request.url, max_attempts, failure
                );
                break;
            }

            let delay = match &failure {
                FailureClass::ServerError => self.config.server_error_delay(attempt),
                FailureClass::Transient(_) => self.config.transient_delay(),
            };
            debug!(
                "{} {} failed (attempt {}/{}). Retrying in {:?}: {:?}",
                request.method,
                request.url,
                attempt + 1,
                max_attempts,
                delay,
                failure
            );
            tokio::time::sleep(delay).await;
        }

        None
    }
}

/// Fixed-delay retry for whole multi-step operations.
pub async fn with_retry<T, F, Fut>(
    max_attempts: u32,
    delay: Duration,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(e) if attempt >= max_attempts => {
                let error_msg = format!("{}", e);
                return Err(e).context(format!(
                    "{} failed after {} attempts. Last error: {}",
                    operation_name, max_attempts, error_msg
                ));
            }
            Err(e) => {
                warn!(
                    "{} failed (attempt {}/{}). Retrying in {:?}: {}",
                    operation_name, attempt, max_attempts, delay, e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
