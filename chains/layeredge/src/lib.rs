//! LayerEdge light-node campaign: daily check-ins, proof submission, node
//! keep-alive and referral registration for a list of wallets.

pub mod campaign;
pub mod client;
pub mod config;
pub mod referral;
pub mod task;

pub use campaign::{CampaignInputs, CampaignRunner, CycleReport, TransportFactory};
pub use client::AccountSession;
pub use config::{LayerEdgeConfig, TaskKind};
pub use referral::{ReferralClient, ReferralRunner, ReferralSummary};
pub use task::{OperationOutcome, OutcomeStatus};
