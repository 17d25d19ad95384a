//! HTTP metadata source.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use tokenroute_traits::{ContractDescriptor, HandlerMetadata, MetadataSource, SourceError};

/// Default request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
struct MetadataRequest<'a> {
    project_id: u64,
    contract: Option<&'a ContractDescriptor>,
}

/// Fetches handler metadata from `POST {base_url}/handlers/metadata`.
pub struct HttpMetadataSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpMetadataSource {
    /// Create a source with the default timeout
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .user_agent(concat!("tokenroute/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    /// Set the bearer token sent with every request
    pub fn with_api_key(mut self, key: String) -> Self {
        self.api_key = Some(key);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/handlers/metadata", self.base_url)
    }
}

#[async_trait]
impl MetadataSource for HttpMetadataSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_handler_metadata(
        &self,
        project_id: u64,
        contract: Option<&ContractDescriptor>,
    ) -> Result<HandlerMetadata, SourceError> {
        let mut request = self
            .client
            .post(self.endpoint())
            .json(&MetadataRequest {
                project_id,
                contract,
            });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!("POST {} (project {})", self.endpoint(), project_id);
        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(project_id));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Http(format!("{}: {}", status, body.trim())));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| SourceError::Decode(e.to_string()))
    }
}
