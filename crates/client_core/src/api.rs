use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::IssueKey,
    error::ApiFailure,
    protocol::{
        MlPreloadStatus, MlPreloadStatusResponse, ModelOptions, ModelOptionsResponse, SlaData,
        SlaResponse, StartPreloadResponse,
    },
};
use tracing::debug;
use url::Url;

use crate::error::ClientError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[async_trait]
pub trait SlaSource: Send + Sync {
    async fn issue_sla(&self, issue: &IssueKey) -> Result<SlaData>;
}

pub struct MissingSlaSource;

#[async_trait]
impl SlaSource for MissingSlaSource {
    async fn issue_sla(&self, issue: &IssueKey) -> Result<SlaData> {
        Err(anyhow!("sla source is unavailable for issue {issue}"))
    }
}

#[async_trait]
pub trait PreloadBackend: Send + Sync {
    async fn start_preload(&self) -> Result<String>;
    async fn preload_status(&self) -> Result<MlPreloadStatus>;
}

pub struct MissingPreloadBackend;

#[async_trait]
impl PreloadBackend for MissingPreloadBackend {
    async fn start_preload(&self) -> Result<String> {
        Err(anyhow!("ml preload backend is unavailable"))
    }

    async fn preload_status(&self) -> Result<MlPreloadStatus> {
        Err(anyhow!("ml preload backend is unavailable"))
    }
}

/// Thin typed client for the dashboard backend.
#[derive(Clone)]
pub struct FlowingApi {
    http: Client,
    base_url: Url,
}

impl FlowingApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url.trim()).map_err(|e| ClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "expected an http(s) base url".to_string(),
            });
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::HttpClient)?;
        Ok(Self {
            http,
            base_url: parsed,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn issue_sla(&self, issue: &IssueKey) -> Result<SlaData, ClientError> {
        let url = self.endpoint(&["api", "issues", issue.as_str(), "sla"])?;
        let response: SlaResponse = self.get_json(url.clone()).await?;
        let endpoint = url.path().to_string();
        if !response.success {
            return Err(ClientError::Unsuccessful {
                endpoint,
                reason: response
                    .error
                    .unwrap_or_else(|| "success flag not set".to_string()),
            });
        }
        response.data.ok_or(ClientError::MalformedResponse {
            endpoint,
            reason: "missing data".to_string(),
        })
    }

    pub async fn ml_preload_status(&self) -> Result<MlPreloadStatus, ClientError> {
        let url = self.endpoint(&["api", "ml", "preload", "status"])?;
        let response: MlPreloadStatusResponse = self.get_json(url.clone()).await?;
        let endpoint = url.path().to_string();
        if !response.success {
            return Err(ClientError::Unsuccessful {
                endpoint,
                reason: response
                    .error
                    .unwrap_or_else(|| "success flag not set".to_string()),
            });
        }
        response.status.ok_or(ClientError::MalformedResponse {
            endpoint,
            reason: "missing status".to_string(),
        })
    }

    pub async fn start_ml_preload(&self) -> Result<String, ClientError> {
        let url = self.endpoint(&["api", "ml", "preload"])?;
        let response = self
            .http
            .post(url.clone())
            .send()
            .await
            .map_err(|source| transport(&url, source))?;
        let body: StartPreloadResponse = decode(&url, response).await?;
        if !body.success {
            return Err(ClientError::Unsuccessful {
                endpoint: url.path().to_string(),
                reason: if body.message.is_empty() {
                    "success flag not set".to_string()
                } else {
                    body.message
                },
            });
        }
        Ok(body.message)
    }

    pub async fn model_options(&self) -> Result<ModelOptions, ClientError> {
        let url = self.endpoint(&["api", "models", "options"])?;
        let response: ModelOptionsResponse = self.get_json(url).await?;
        Ok(response.options)
    }

    /// Appends path segments to the base url; each segment is percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "base url cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        debug!(endpoint = url.path(), "GET");
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| transport(&url, source))?;
        decode(&url, response).await
    }
}

async fn decode<T: DeserializeOwned>(url: &Url, response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| transport(url, source))?;

    if !status.is_success() {
        let reason = serde_json::from_str::<ApiFailure>(&body)
            .ok()
            .and_then(|failure| failure.reason());
        return Err(ClientError::Status {
            endpoint: url.path().to_string(),
            status: status.as_u16(),
            reason,
        });
    }

    serde_json::from_str(&body).map_err(|e| ClientError::MalformedResponse {
        endpoint: url.path().to_string(),
        reason: e.to_string(),
    })
}

fn transport(url: &Url, source: reqwest::Error) -> ClientError {
    ClientError::Transport {
        endpoint: url.path().to_string(),
        source,
    }
}

#[async_trait]
impl SlaSource for FlowingApi {
    async fn issue_sla(&self, issue: &IssueKey) -> Result<SlaData> {
        Ok(FlowingApi::issue_sla(self, issue).await?)
    }
}

#[async_trait]
impl PreloadBackend for FlowingApi {
    async fn start_preload(&self) -> Result<String> {
        Ok(self.start_ml_preload().await?)
    }

    async fn preload_status(&self) -> Result<MlPreloadStatus> {
        Ok(self.ml_preload_status().await?)
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
