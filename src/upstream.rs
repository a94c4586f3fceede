use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::rpc::RpcRequest;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("timeout")]
    Timeout,
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("returned HTTP {0}")]
    HttpStatus(u16),
    #[error("invalid JSON body: {0}")]
    InvalidBody(String),
    #[error("request failed: {0}")]
    Network(String),
}

#[async_trait]
pub trait RpcCaller: Send + Sync {
    async fn call(
        &self,
        host: &str,
        request: &RpcRequest,
        timeout: Duration,
    ) -> Result<Value, UpstreamError>;
}

pub struct HttpCaller {
    client: Client,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProxyHealth {
    pub status: u16,
    pub body: Option<String>,
}

impl HttpCaller {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    pub async fn probe_health(
        &self,
        proxy_url: &str,
        timeout: Duration,
    ) -> Result<ProxyHealth, UpstreamError> {
        let url = format!("{}/health", proxy_url.trim_end_matches('/'));
        let mut req = self.client.get(&url).timeout(timeout);
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }

        let response = req.send().await.map_err(classify_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.ok();
        Ok(ProxyHealth { status, body })
    }
}

#[async_trait]
impl RpcCaller for HttpCaller {
    async fn call(
        &self,
        host: &str,
        request: &RpcRequest,
        timeout: Duration,
    ) -> Result<Value, UpstreamError> {
        let mut req = self
            .client
            .post(host)
            .timeout(timeout)
            .json(&request.to_body());
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }

        let response = req.send().await.map_err(classify_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::HttpStatus(status.as_u16()));
        }

        response.json::<Value>().await.map_err(|err| {
            if err.is_timeout() {
                UpstreamError::Timeout
            } else {
                UpstreamError::InvalidBody(err.to_string())
            }
        })
    }
}

fn classify_error(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout
    } else if err.is_connect() {
        UpstreamError::ConnectionFailed(err.to_string())
    } else {
        UpstreamError::Network(err.to_string())
    }
}
