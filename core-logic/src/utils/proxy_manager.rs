use super::http_client::ReqwestTransport;
use crate::config::{ProxyConfig, ProxyScheme};
use crate::error::ProxyError;
use crate::traits::HttpTransport;
use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

/// `[scheme://][user:pass@]host:port`
static STRUCTURED_PROXY: OnceLock<Regex> = OnceLock::new();

fn structured_proxy() -> &'static Regex {
    STRUCTURED_PROXY.get_or_init(|| {
        Regex::new(
            r"^(?:([A-Za-z][A-Za-z0-9+.\-]*)://)?(?:([^:@/\s]+):([^@/\s]+)@)?([^:@/\s]+):(\d+)/?$",
        )
        .expect("static proxy pattern compiles")
    })
}

/// Turns proxy specification strings into transports.
pub struct ProxyManager;

impl ProxyManager {
    pub const PROXY_FILE: &'static str = "proxy.txt";
    pub const SESSION_ID_LEN: usize = 8;

    /// Loads raw proxy specs, one per line. Blank lines and `#` comments are skipped.
    /// A missing or unreadable file means "no proxies", never an error.
    pub fn load_proxy_specs(path: impl AsRef<Path>) -> Vec<String> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("{} not found. Running without proxies.", path.display());
            return Vec::new();
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read {}: {}. Running without proxies.", path.display(), e);
                return Vec::new();
            }
        };

        let specs: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();

        info!("Loaded {} proxies from {}", specs.len(), path.display());
        specs
    }

    /// Parses one proxy spec.
    ///
    /// Accepted shapes, in order: `[scheme://][user:pass@]host:port`, then the
    /// colon-separated fallbacks `host:port`, `host:port:scheme`, `scheme:host:port`
    /// and `host:port:user:pass`. A missing scheme means `http`.
    pub fn parse(spec: &str) -> Result<ProxyConfig, ProxyError> {
        let spec = spec.trim();
        let invalid = || ProxyError::InvalidProxyFormat {
            spec: spec.to_string(),
        };

        if let Some(caps) = structured_proxy().captures(spec) {
            let scheme = match caps.get(1) {
                Some(token) => resolve_scheme(token.as_str())?,
                None => ProxyScheme::Http,
            };
            let host = &caps[4];
            let port = parse_port(&caps[5]).ok_or_else(invalid)?;
            let config = ProxyConfig::new(scheme, host, port);
            return Ok(match (caps.get(2), caps.get(3)) {
                (Some(user), Some(pass)) => config.with_credentials(user.as_str(), pass.as_str()),
                _ => config,
            });
        }

        let parts: Vec<&str> = spec.split(':').map(str::trim).collect();
        if parts.iter().any(|p| p.is_empty() || p.contains(char::is_whitespace)) {
            return Err(invalid());
        }

        match parts.as_slice() {
            [host, port] => {
                let port = parse_port(port).ok_or_else(invalid)?;
                Ok(ProxyConfig::new(ProxyScheme::Http, *host, port))
            }
            [host, port, scheme] if parse_port(port).is_some() => {
                let port = parse_port(port).ok_or_else(invalid)?;
                Ok(ProxyConfig::new(resolve_scheme(scheme)?, *host, port))
            }
            [scheme, host, port] => {
                let port = parse_port(port).ok_or_else(invalid)?;
                Ok(ProxyConfig::new(resolve_scheme(scheme)?, *host, port))
            }
            [host, port, username, password] => {
                let port = parse_port(port).ok_or_else(invalid)?;
                Ok(ProxyConfig::new(ProxyScheme::Http, *host, port)
                    .with_credentials(*username, *password))
            }
            _ => Err(invalid()),
        }
    }

    /// Builds the adapter for a spec. `None` means a direct connection and yields `Ok(None)`.
    pub fn build(spec: Option<&str>) -> Result<Option<Arc<dyn HttpTransport>>, ProxyError> {
        match spec {
            None => Ok(None),
            Some(spec) => {
                let config = Self::parse(spec)?;
                Ok(Some(Self::build_transport(Some(&config))?))
            }
        }
    }

    /// Builds the adapter for an already-parsed proxy, or a direct one.
    pub fn build_transport(
        proxy: Option<&ProxyConfig>,
    ) -> Result<Arc<dyn HttpTransport>, ProxyError> {
        let transport = match proxy {
            Some(config) => ReqwestTransport::with_proxy(config)?,
            None => ReqwestTransport::direct()?,
        };
        Ok(Arc::new(transport))
    }

    /// Round-robin assignment: item `index % len`, or `None` for an empty list.
    pub fn pick_round_robin<T>(items: &[T], index: usize) -> Option<&T> {
        if items.is_empty() {
            None
        } else {
            items.get(index % items.len())
        }
    }

    pub fn pick_random<T>(items: &[T]) -> Option<&T> {
        if items.is_empty() {
            None
        } else {
            items.get(rand::thread_rng().gen_range(0..items.len()))
        }
    }

    /// Random alphanumeric token for sticky-session proxy providers.
    pub fn generate_session_id(len: usize) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }
}

fn resolve_scheme(token: &str) -> Result<ProxyScheme, ProxyError> {
    ProxyScheme::from_token(token).ok_or_else(|| ProxyError::UnsupportedScheme {
        scheme: token.to_ascii_lowercase(),
    })
}

fn parse_port(raw: &str) -> Option<u16> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u16>().ok().filter(|p| *p != 0)
}
