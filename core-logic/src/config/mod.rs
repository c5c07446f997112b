use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tunnel protocol of a parsed proxy. A direct connection has no `ProxyConfig` at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyScheme {
    Http,
    Https,
    Socks4,
    Socks5,
}

impl ProxyScheme {
    /// Maps a scheme token to its variant. `socks4h`/`socks5h` collapse onto the
    /// plain variants.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            "socks4" | "socks4h" => Some(Self::Socks4),
            "socks5" | "socks5h" => Some(Self::Socks5),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::Socks4 => "socks4",
            Self::Socks5 => "socks5",
        }
    }

    pub fn is_socks(&self) -> bool {
        matches!(self, Self::Socks4 | Self::Socks5)
    }
}

impl fmt::Display for ProxyScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub scheme: ProxyScheme,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sticky-session token for providers that hand out a fresh upstream IP per session.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ProxyConfig {
    pub fn new(scheme: ProxyScheme, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme,
            host: host.into(),
            port,
            username: None,
            password: None,
            session_id: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Base URL (`scheme://host:port`) plus the `session` query when one is set.
    pub fn base_url(&self) -> String {
        let mut url = format!("{}://{}:{}", self.scheme, self.host, self.port);
        if let Some(session) = &self.session_id {
            url.push_str("?session=");
            url.push_str(session);
        }
        url
    }
}

// Keeps the password out of logs.
impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***REDACTED***"))
            .field("session_id", &self.session_id)
            .finish()
    }
}

impl fmt::Display for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.username {
            Some(user) => write!(f, "{}://{}:***@{}:{}", self.scheme, user, self.host, self.port),
            None => write!(f, "{}://{}:{}", self.scheme, self.host, self.port),
        }
    }
}

/// How a batch of independent per-wallet jobs is driven.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingMode {
    /// One wallet's whole job finishes before the next starts.
    #[default]
    Sequential,
    /// Every job is spawned at once and awaited jointly.
    FanOut,
}

impl FromStr for SchedulingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "sequential" => Ok(Self::Sequential),
            "fan_out" | "fanout" | "concurrent" => Ok(Self::FanOut),
            other => Err(ConfigError::InvalidValue {
                field: "scheduling_mode".to_string(),
                reason: format!("unknown mode '{}', expected 'sequential' or 'fan_out'", other),
            }),
        }
    }
}

impl fmt::Display for SchedulingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => f.write_str("sequential"),
            Self::FanOut => f.write_str("fan_out"),
        }
    }
}
