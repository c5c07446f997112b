//! Remote operations of one [`AccountSession`](crate::client::AccountSession).
//!
//! Each operation is a free function returning an [`OperationOutcome`]. Expected
//! remote conditions (cooldowns, rejections, missing responses) and signing
//! failures all become outcomes; nothing here returns `Err` to the runner.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

pub mod t01_daily_check_in;
pub mod t02_submit_proof;
pub mod t03_claim_proof_points;
pub mod t04_node_status;
pub mod t05_claim_light_node_points;
pub mod t06_check_node_points;

pub use self::t01_daily_check_in::daily_check_in;
pub use self::t02_submit_proof::submit_proof;
pub use self::t03_claim_proof_points::claim_proof_points;
pub use self::t04_node_status::{check_node_status, connect_node, stop_node};
pub use self::t05_claim_light_node_points::claim_light_node_points;
pub use self::t06_check_node_points::check_node_points;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeStatus {
    Success,
    Warn,
    Error,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("SUCCESS"),
            Self::Warn => f.write_str("WARN"),
            Self::Error => f.write_str("FAILED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub status: OutcomeStatus,
    pub message: String,
}

impl OperationOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Success,
            message: message.into(),
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Warn,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

impl fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.message)
    }
}

/// Error outcome for an operation that never got a signature.
pub(crate) fn signing_failed(operation: &str, err: anyhow::Error) -> OperationOutcome {
    OperationOutcome::error(format!("Error {}: {:#}", operation, err))
}

/// `message` field of a JSON body, rendered for log lines.
pub(crate) fn body_message(body: &serde_json::Value) -> &str {
    body.get("message")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown response")
}

/// Fallback when a cooldown message carries no `after <X>!` clause.
pub const UNKNOWN_COOLDOWN: &str = "unknown time";

static COOLDOWN: OnceLock<Regex> = OnceLock::new();

/// Extracts `X` from a rejection like `"... try again after 3h 12m!"`.
///
/// Pattern: `after\s+([^!]+)!`. Returns [`UNKNOWN_COOLDOWN`] when it does not match.
pub fn parse_cooldown(message: &str) -> String {
    let pattern = COOLDOWN.get_or_init(|| {
        Regex::new(r"after\s+([^!]+)!").expect("static cooldown pattern compiles")
    });

    pattern
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_COOLDOWN.to_string())
}
