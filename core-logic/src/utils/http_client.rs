use crate::config::ProxyConfig;
use crate::error::{NetworkError, ProxyError};
use crate::http::{HttpMethod, HttpResponse, RequestDescriptor};
use crate::traits::HttpTransport;
use async_trait::async_trait;
use reqwest::{Client, Proxy};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// reqwest-backed transport, optionally tunnelled through one proxy.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    label: String,
}

impl ReqwestTransport {
    pub fn direct() -> Result<Self, ProxyError> {
        let client = Self::client_builder()
            .build()
            .map_err(|e| ProxyError::Transport {
                url: "direct".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            label: "direct".to_string(),
        })
    }

    pub fn with_proxy(proxy_config: &ProxyConfig) -> Result<Self, ProxyError> {
        let base_url = proxy_config.base_url();
        let transport_err = |reason: String| ProxyError::Transport {
            url: proxy_config.to_string(),
            reason,
        };

        // SOCKS credentials travel in the URL; HTTP tunnels use Proxy-Authorization.
        let proxy = if proxy_config.scheme.is_socks() {
            let mut url = Url::parse(&base_url).map_err(|e| transport_err(e.to_string()))?;
            if let (Some(username), Some(password)) =
                (&proxy_config.username, &proxy_config.password)
            {
                url.set_username(username)
                    .and_then(|_| url.set_password(Some(password)))
                    .map_err(|_| transport_err("credentials rejected".to_string()))?;
            }
            Proxy::all(url.as_str()).map_err(|e| transport_err(e.to_string()))?
        } else {
            let proxy = Proxy::all(&base_url).map_err(|e| transport_err(e.to_string()))?;
            match (&proxy_config.username, &proxy_config.password) {
                (Some(username), Some(password)) => proxy.basic_auth(username, password),
                _ => proxy,
            }
        };

        let client = Self::client_builder()
            .proxy(proxy)
            .build()
            .map_err(|e| transport_err(e.to_string()))?;

        Ok(Self {
            client,
            label: proxy_config.to_string(),
        })
    }

    fn client_builder() -> reqwest::ClientBuilder {
        Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<HttpResponse, NetworkError> {
        let endpoint = request.url.clone();
        let headers = request.effective_headers();

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        }
        .timeout(request.timeout);

        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = &request.body {
            if !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
                builder = builder.header("Content-Type", "application/json");
            }
            builder = builder.body(body.to_string());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                NetworkError::Timeout {
                    timeout_ms: request.timeout.as_millis() as u64,
                    endpoint: endpoint.clone(),
                }
            } else {
                NetworkError::Connection {
                    endpoint: endpoint.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| NetworkError::InvalidResponse {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;

        debug!("{} {} via {} -> {}", request.method, endpoint, self.label, status);
        Ok(HttpResponse::from_text(status, &text))
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
