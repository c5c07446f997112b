//! # Core Logic - Shared Utilities for Testnet Automation
//!
//! This crate provides the chain-agnostic plumbing shared by every project in the
//! workspace: proxy parsing and transports, a retrying HTTP executor, the flat
//! wallet store, logging and worker scheduling.
//!
//! ## Modules
//!
//! - [`config`] - Proxy and scheduling configuration types
//! - [`error`] - Typed error handling with thiserror
//! - [`http`] - Transport-agnostic request/response model
//! - [`traits`] - Core trait definitions (HTTP transport, wallet loading)
//! - [`utils`] - Utility modules (proxy, retry, wallet store, logger, runner)

// Module declarations - internal modules marked pub(crate)
pub mod config;
pub mod error;
pub mod http;
pub mod traits;
pub(crate) mod utils;

// Selective exports - only public API types
pub use config::{ProxyConfig, ProxyScheme, SchedulingMode};
pub use error::{ConfigError, NetworkError, ProxyError, WalletError};
pub use http::{HttpMethod, HttpResponse, RequestDescriptor};
pub use traits::{HttpTransport, WalletLoader};

// Utils are pub(crate) - only export specific public utilities
pub use utils::{
    setup_logger, ProxyManager, ReqwestTransport, WalletIdentity, WalletStore, WorkerRunner,
    TASK_RESULT_TARGET,
};

pub use utils::retry::{classify, with_retry, FailureClass, RetryConfig, RetryingExecutor};
