//! HTTP certificate signer implementation.
//!
//! Talks to a remote signing daemon with a small JSON protocol:
//!
//! ```text
//! POST {base_url}/x509   {"csr": "<PEM CSR>"}   -> 201 {"pem": "<PEM certificate>"}
//! GET  {base_url}/x509                          -> 200 {"pem": "<PEM CA chain>"}
//! ```
//!
//! Any non-success HTTP status is the daemon declining the request and maps
//! to `Ok(None)`. Transport failures are retried with backoff and then surface
//! as `InstanceError::Signer`.

use super::backend::{CertSigner, CertSignerType};
use crate::config::SignerConfig;
use crate::errors::{InstanceError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

#[derive(Debug, Serialize)]
struct X509SignRequest<'a> {
    csr: &'a str,
}

#[derive(Debug, Deserialize)]
struct PemResponse {
    pem: String,
}

/// Backoff schedule for transport failures reaching the signing daemon.
///
/// Only connect errors and timeouts are retried. A daemon that answers, with
/// any status, has made its decision and is not asked again.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts per request, the first one included
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_backoff: Duration,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
    /// Growth factor applied per further attempt
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay to wait before attempt number `attempt` (0 is the first attempt).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let secs = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }
}

/// Certificate signer backed by a remote HTTP signing daemon.
#[derive(Debug, Clone)]
pub struct HttpCertSigner {
    client: reqwest::Client,
    x509_endpoint: Url,
    retry_config: RetryConfig,
}

impl HttpCertSigner {
    /// Create a signer for the daemon at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| {
            InstanceError::config(format!("Invalid signer URL '{}': {}", base_url, e))
        })?;
        let x509_endpoint =
            Url::parse(&format!("{}/x509", base.as_str().trim_end_matches('/'))).map_err(|e| {
                InstanceError::config(format!("Invalid signer URL '{}': {}", base_url, e))
            })?;

        let client = reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
            InstanceError::config(format!("Failed to build signer HTTP client: {}", e))
        })?;

        Ok(Self { client, x509_endpoint, retry_config: RetryConfig::default() })
    }

    /// Configure custom retry behavior.
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Create a signer from configuration.
    ///
    /// Returns `Ok(None)` when no signer URL is configured.
    pub fn from_config(config: &SignerConfig) -> Result<Option<Self>> {
        let Some(url) = config.url.as_deref() else {
            return Ok(None);
        };

        let retry_config = RetryConfig { max_attempts: config.max_attempts, ..Default::default() };
        let signer = Self::new(url, config.timeout())?.with_retry_config(retry_config);

        info!(
            endpoint = %signer.x509_endpoint,
            max_attempts = config.max_attempts,
            timeout_seconds = config.timeout_seconds,
            "Configured HTTP certificate signer"
        );

        Ok(Some(signer))
    }

    pub fn endpoint(&self) -> &Url {
        &self.x509_endpoint
    }

    /// Send a request, retrying transport failures with backoff.
    async fn send_with_retry<F>(&self, operation: &'static str, build: F) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let max_attempts = self.retry_config.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let backoff = self.retry_config.delay_before(attempt);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    max_attempts,
                    backoff_ms = backoff.as_millis(),
                    "Retrying certificate signer request after backoff"
                );
                tokio::time::sleep(backoff).await;
            }

            match build().send().await {
                Ok(response) => return Ok(response),
                Err(e) if is_retryable_transport_error(&e) && attempt + 1 < max_attempts => {
                    warn!(error = %e, operation, attempt = attempt + 1, "Transient signer error, will retry");
                    last_error = Some(e);
                }
                Err(e) => {
                    error!(error = %e, operation, endpoint = %self.x509_endpoint, "Certificate signer request failed");
                    return Err(InstanceError::signer(format!("{} request failed: {}", operation, e)));
                }
            }
        }

        Err(InstanceError::signer(format!(
            "{} request failed after {} attempts: {}",
            operation,
            max_attempts,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// Decode a `{"pem": ...}` body; malformed bodies are hard failures.
    async fn read_pem(operation: &'static str, response: reqwest::Response) -> Result<String> {
        let body: PemResponse = response.json().await.map_err(|e| {
            InstanceError::signer(format!("{} returned a malformed body: {}", operation, e))
        })?;
        Ok(body.pem)
    }
}

fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}

#[async_trait]
impl CertSigner for HttpCertSigner {
    async fn generate_x509_certificate(&self, csr: &str) -> Result<Option<String>> {
        let request = X509SignRequest { csr };
        let response = self
            .send_with_retry("sign", || {
                self.client.post(self.x509_endpoint.clone()).json(&request)
            })
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED && status != StatusCode::OK {
            warn!(status = %status, endpoint = %self.x509_endpoint, "Certificate signer declined CSR");
            return Ok(None);
        }

        let pem = Self::read_pem("sign", response).await?;
        debug!(bytes = pem.len(), "Certificate signer returned certificate");
        Ok(Some(pem))
    }

    async fn get_ca_certificate(&self) -> Result<Option<String>> {
        let response = self
            .send_with_retry("ca_certificate", || self.client.get(self.x509_endpoint.clone()))
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, endpoint = %self.x509_endpoint, "Certificate signer has no CA chain");
            return Ok(None);
        }

        Self::read_pem("ca_certificate", response).await.map(Some)
    }

    fn signer_type(&self) -> CertSignerType {
        CertSignerType::Http
    }
}
