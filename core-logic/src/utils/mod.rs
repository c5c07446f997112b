//! # Utilities Module
//!
//! Internal utility modules for the core-logic crate.
//! These modules are marked as `pub(crate)` to enforce API boundaries.

// Internal modules - not part of public API
pub(crate) mod http_client;
pub(crate) mod logger;
pub(crate) mod proxy_manager;
pub(crate) mod retry;
pub(crate) mod runner;
pub(crate) mod wallet_manager;

// Selective exports - only public utilities
pub use http_client::ReqwestTransport;
pub use logger::{setup_logger, TASK_RESULT_TARGET};
pub use proxy_manager::ProxyManager;
pub use runner::WorkerRunner;
pub use wallet_manager::{WalletIdentity, WalletStore};
