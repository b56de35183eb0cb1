//! Authenticated HTTP transport for the OpenShift API.
//!
//! Every call carries `Authorization: Bearer {token}` and is bounded by a
//! fixed per-call timeout. Certificate verification follows the
//! [`TlsPolicy`] chosen when the transport is built. There is no retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Certificate, Client};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::{TlsPolicy, DEFAULT_TIMEOUT_SECS};
use crate::error::CancellerError;

const PEM_CERT_MARKER: &[u8] = b"-----BEGIN CERTIFICATE-----";

/// Raw GET/PUT access to the API server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url` and return the response body.
    async fn get(&self, url: &Url) -> Result<String, CancellerError>;

    /// Replace the resource at `url` with `document` and return the response body.
    async fn put(&self, url: &Url, document: &Value) -> Result<String, CancellerError>;
}

/// `reqwest`-backed [`Transport`].
#[derive(Clone)]
pub struct HttpTransport {
    /// HTTP client.
    client: Client,
    /// Bearer token, possibly empty.
    token: String,
    /// Per-call timeout.
    timeout: Duration,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Create a transport with the default 120 second timeout.
    ///
    /// # Errors
    /// Returns error if the CA file cannot be loaded or the client cannot be built.
    pub fn new(token: impl Into<String>, tls: &TlsPolicy) -> Result<Self, CancellerError> {
        Self::with_timeout(token, tls, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a transport with an explicit per-call timeout.
    ///
    /// # Errors
    /// Returns error if the CA file cannot be loaded or the client cannot be built.
    pub fn with_timeout(
        token: impl Into<String>,
        tls: &TlsPolicy,
        timeout: Duration,
    ) -> Result<Self, CancellerError> {
        let mut builder = Client::builder().timeout(timeout);

        match tls {
            TlsPolicy::Strict => {}
            TlsPolicy::CustomCa(path) => {
                let pem = std::fs::read(path).map_err(|e| {
                    CancellerError::Config(format!(
                        "Failed to read CA certificate {}: {e}",
                        path.display()
                    ))
                })?;
                if !pem.windows(PEM_CERT_MARKER.len()).any(|w| w == PEM_CERT_MARKER) {
                    return Err(CancellerError::Config(format!(
                        "CA file {} contains no PEM certificate",
                        path.display()
                    )));
                }
                let cert = Certificate::from_pem(&pem).map_err(|e| {
                    CancellerError::Config(format!(
                        "Failed to parse CA certificate {}: {e}",
                        path.display()
                    ))
                })?;
                builder = builder.add_root_certificate(cert);
            }
            TlsPolicy::Insecure => {
                // With rustls this disables hostname checks as well.
                warn!("TLS verification disabled: accepting any certificate and hostname");
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        let client = builder
            .build()
            .map_err(|e| CancellerError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token: token.into(),
            timeout,
        })
    }

    /// Per-call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn transport_error(&self, url: &Url, err: reqwest::Error) -> CancellerError {
        if err.is_timeout() {
            CancellerError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }
        } else {
            CancellerError::Http(err)
        }
    }

    /// Turn a response into its body, or an error for non-2xx statuses.
    async fn handle_response(
        &self,
        url: &Url,
        response: reqwest::Response,
    ) -> Result<String, CancellerError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        if status.is_success() {
            Ok(text)
        } else {
            warn!(url = %url, status = status.as_u16(), "API request rejected");
            Err(CancellerError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<String, CancellerError> {
        debug!(url = %url, "GET request");

        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, self.bearer())
            .header(ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        self.handle_response(url, response).await
    }

    async fn put(&self, url: &Url, document: &Value) -> Result<String, CancellerError> {
        debug!(url = %url, "PUT request");

        let response = self
            .client
            .put(url.clone())
            .header(AUTHORIZATION, self.bearer())
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(document)?)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        self.handle_response(url, response).await
    }
}
