//! Minimal HTTP GET seam used by the provider and the IP geolocator.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::error::WeatherError;

#[cfg(test)]
use mockall::automock;

/// Status line and raw body of an HTTP response, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a GET with the given query parameters. Only transport-level
    /// failures are errors; non-2xx statuses come back as a reply.
    async fn get(&self, url: &str, params: &[(String, String)]) -> Result<HttpReply, WeatherError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a client with an overall request timeout. Without one, reqwest's
    /// defaults apply.
    pub fn with_timeout(timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, params: &[(String, String)]) -> Result<HttpReply, WeatherError> {
        let res = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            // the query string carries the API key, keep it out of the message
            .map_err(|e| WeatherError::Unknown(format!("Failed to reach {url}: {}", e.without_url())))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| {
                WeatherError::Unknown(format!("Failed to read response body: {}", e.without_url()))
            })?;

        debug!(%url, status = status.as_u16(), bytes = body.len(), "http reply");

        Ok(HttpReply {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}
