//! # Core Error Types
//!
//! Typed errors for the core-logic crate. Application code wraps them in `anyhow`.

use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Parse error for '{field}': {source}")]
    ParseError {
        field: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Wallet store and key generation errors
#[derive(Error, Debug, Clone)]
pub enum WalletError {
    #[error("I/O error on wallet file '{path}': {msg}")]
    Io { path: String, msg: String },

    #[error("Wallet file '{path}' is not a valid wallet list: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("Refusing to persist incomplete wallet: missing {field}")]
    Incomplete { field: &'static str },

    #[error("Wallet generation failed: {reason}")]
    Generation { reason: String },
}

/// Network and HTTP-related errors
#[derive(Error, Debug, Clone)]
pub enum NetworkError {
    #[error("Request timeout after {timeout_ms}ms to {endpoint}")]
    Timeout { timeout_ms: u64, endpoint: String },

    #[error("Connection to {endpoint} failed: {reason}")]
    Connection { endpoint: String, reason: String },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

/// Proxy specification and adapter errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProxyError {
    #[error("Invalid proxy format: {spec}")]
    InvalidProxyFormat { spec: String },

    #[error("Unsupported proxy protocol: {scheme}")]
    UnsupportedScheme { scheme: String },

    #[error("Failed to build proxy transport for {url}: {reason}")]
    Transport { url: String, reason: String },
}
