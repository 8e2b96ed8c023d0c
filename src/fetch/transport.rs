// src/fetch/transport.rs
//! Transport strategies behind the resilient client. Both concrete transports
//! are reqwest clients configured differently, so that a wedged connection
//! pool on the primary path does not also sink the fallback.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL};
use reqwest::{Client, Method, Url};
use thiserror::Error;

const USER_AGENT: &str = "digest-dashboard/0.1";

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    /// Bearer token, already resolved against the session.
    pub bearer: Option<String>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn authorization_header(&self) -> Option<String> {
        self.bearer.as_ref().map(|t| format!("Bearer {t}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Raised only when no HTTP response was obtained at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{transport}: {message}")]
pub struct TransportError {
    pub transport: &'static str,
    pub message: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Any HTTP status is a successful send; classification is the caller's job.
    async fn send(&self, req: &ApiRequest) -> std::result::Result<ApiResponse, TransportError>;
    fn name(&self) -> &'static str;
}

async fn send_with(
    client: &Client,
    name: &'static str,
    req: &ApiRequest,
) -> std::result::Result<ApiResponse, TransportError> {
    let to_err = |e: reqwest::Error| TransportError {
        transport: name,
        message: e.to_string(),
    };

    let mut builder = client.request(req.method.clone(), req.url.clone());
    if let Some(token) = &req.bearer {
        builder = builder.bearer_auth(token);
    }
    if let Some(body) = &req.body {
        builder = builder.json(body);
    }
    let resp = builder.send().await.map_err(to_err)?;
    let status = resp.status().as_u16();
    let body = resp.bytes().await.map_err(to_err)?;
    Ok(ApiResponse {
        status,
        body: body.to_vec(),
    })
}

/// Pooled client with JSON/no-cache defaults.
pub struct PrimaryTransport {
    client: Client,
}

impl PrimaryTransport {
    /// `timeout: None` waits for as long as the underlying stack allows.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers);
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().context("building primary http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for PrimaryTransport {
    async fn send(&self, req: &ApiRequest) -> std::result::Result<ApiResponse, TransportError> {
        send_with(&self.client, self.name(), req).await
    }

    fn name(&self) -> &'static str {
        "primary"
    }
}

/// Plain HTTP/1.1 client without connection reuse.
pub struct FallbackTransport {
    client: Client,
}

impl FallbackTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .http1_only()
            .pool_max_idle_per_host(0);
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().context("building fallback http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for FallbackTransport {
    async fn send(&self, req: &ApiRequest) -> std::result::Result<ApiResponse, TransportError> {
        send_with(&self.client, self.name(), req).await
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}
