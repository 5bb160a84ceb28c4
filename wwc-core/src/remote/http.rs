//! HTTP transport for the synthesis service.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{Endpoint, Transport};
use crate::config::ServerConfig;
use crate::error::{ConfigError, RemoteError};

/// reqwest-backed transport posting JSON to `<base_url>/<endpoint>`.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &ServerConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ConfigError::Invalid {
                message: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url()?,
            api_token: config.api_token.clone(),
        })
    }

    fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url, RemoteError> {
        self.base_url
            .join(endpoint.path())
            .map_err(|e| RemoteError::Transport {
                endpoint: endpoint.to_string(),
                message: format!("invalid endpoint URL: {e}"),
            })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(
        &self,
        endpoint: Endpoint,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, RemoteError> {
        let url = self.endpoint_url(endpoint)?;
        let mut request = self.client.post(url).json(&body);
        if let Some(ref token) = self.api_token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("token {token}"));
        }

        let response = request.send().await.map_err(|e| RemoteError::Transport {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;
        let status = response.status();
        let text = response.text().await.map_err(|e| RemoteError::Transport {
            endpoint: endpoint.to_string(),
            message: format!("failed to read response body: {e}"),
        })?;
        debug!(endpoint = %endpoint, status = %status, bytes = text.len(), "Received response");

        // The service reports its own 400/500 failures inside a JSON envelope.
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(value) => Ok(value),
            Err(e) if status.is_success() => Err(RemoteError::Decode {
                message: format!("response body is not JSON: {e}"),
            }),
            Err(_) => {
                warn!(endpoint = %endpoint, status = %status, "Non-JSON error response");
                Err(RemoteError::Transport {
                    endpoint: endpoint.to_string(),
                    message: format!("server returned status {status}"),
                })
            }
        }
    }
}
