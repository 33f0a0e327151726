use super::engine_api::{ApiError, EngineApi};
use crate::config::AppConfig;
use crate::request::{join_url, EngineRequest, Method};
use async_trait::async_trait;
use log::{info, warn};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// 基于 reqwest 的引擎会话
///
/// 不做重试；超时由 client 统一控制。
pub struct HttpEngine {
    client: Client,
    base_url: String,
}

impl HttpEngine {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("alphadesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ApiError> {
        Self::new(config.api_url.clone(), config.timeout)
    }

    pub fn url_for(&self, request: &EngineRequest) -> String {
        join_url(&self.base_url, request.path())
    }
}

#[async_trait]
impl EngineApi for HttpEngine {
    async fn send(&self, request: &EngineRequest) -> Result<Value, ApiError> {
        let url = self.url_for(request);
        let mut builder = match request.method() {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = resp.status();
        let raw = resp
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !status.is_success() {
            warn!("{} {:?} [{}] -> {}", self, request.operation, url, status);
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: raw,
            });
        }
        info!("{} {:?} [{}] -> {}", self, request.operation, url, status);

        serde_json::from_str(&raw)
            .map_err(|e| ApiError::Decode(format!("json parse failed: {e}, raw={raw}")))
    }
}

impl std::fmt::Display for HttpEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<HttpEngine [{}]>", self.base_url)
    }
}

impl std::fmt::Debug for HttpEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<HttpEngine [{}]>", self.base_url)
    }
}
