//! Sweep configuration.
//!
//! A [`SweepConfig`] is built once by the caller (the CLI, or any embedding
//! CI glue) and handed to each sweep by reference. Nothing in here is global.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::CancellerError;

/// In-cluster API endpoint used when none is configured.
pub const DEFAULT_API_URL: &str = "https://openshift.default.svc.cluster.local";

/// Namespace swept when none is configured.
pub const DEFAULT_NAMESPACE: &str = "test";

/// Build config name used when none is configured.
pub const DEFAULT_BUILD_CONFIG: &str = "frontend";

/// Service account token mounted into every pod.
pub const DEFAULT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Service account CA bundle mounted into every pod.
pub const SERVICE_ACCOUNT_CA_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// Fixed per-call timeout for API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// How server certificates are verified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsPolicy {
    /// Verify against the platform trust roots.
    #[default]
    Strict,
    /// Verify against the platform roots plus an extra PEM root.
    CustomCa(PathBuf),
    /// Accept any certificate chain and any hostname.
    Insecure,
}

impl std::fmt::Display for TlsPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::CustomCa(path) => write!(f, "custom-ca({})", path.display()),
            Self::Insecure => write!(f, "insecure"),
        }
    }
}

/// Result of the pipeline stage that triggered the sweep.
///
/// Reported for diagnostics only: rogue builds are swept whatever the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PipelineResult {
    #[default]
    Success,
    Unstable,
    Failure,
    Aborted,
}

impl PipelineResult {
    /// Whether the stage finished cleanly.
    pub fn succeeded(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for PipelineResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Unstable => write!(f, "unstable"),
            Self::Failure => write!(f, "failure"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Settings for one sweep invocation.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Base URL of the OpenShift API.
    pub api_url: String,
    /// Namespace to sweep.
    pub namespace: String,
    /// Explicit bearer token; empty means fall back to the mounted token.
    pub auth_token: String,
    /// Emit and collect trace lines for every decision point.
    pub verbose: bool,
    /// Build config the triggering pipeline owns.
    pub build_config_name: String,
    /// Only consider builds labelled with `build_config_name`.
    pub scope_to_build_config: bool,
    /// Certificate verification policy.
    pub tls: TlsPolicy,
    /// Where the ambient token is read from.
    pub token_path: PathBuf,
    /// Per-call timeout. Fixed at 120 s in production; tests shorten it.
    pub timeout: Duration,
    /// Result of the triggering stage.
    pub pipeline_result: PipelineResult,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            auth_token: String::new(),
            verbose: false,
            build_config_name: DEFAULT_BUILD_CONFIG.to_string(),
            scope_to_build_config: false,
            tls: TlsPolicy::default(),
            token_path: PathBuf::from(DEFAULT_TOKEN_PATH),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            pipeline_result: PipelineResult::default(),
        }
    }
}

impl SweepConfig {
    /// Create a config for the given API endpoint and namespace.
    #[must_use]
    pub fn new(api_url: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Set an explicit bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = token.into();
        self
    }

    /// Enable verbose tracing.
    #[must_use]
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Set the certificate verification policy.
    #[must_use]
    pub fn with_tls(mut self, tls: TlsPolicy) -> Self {
        self.tls = tls;
        self
    }

    /// Check the settings before any request is made.
    pub fn validate(&self) -> Result<(), CancellerError> {
        if self.api_url.trim().is_empty() {
            return Err(CancellerError::Config("Please set apiURL".into()));
        }
        if self.namespace.trim().is_empty() {
            return Err(CancellerError::Config("Please set namespace".into()));
        }
        if self.build_config_name.trim().is_empty() {
            return Err(CancellerError::Config("Please set buildConfig".into()));
        }
        if self.namespace.contains('/') {
            return Err(CancellerError::Config(format!(
                "namespace '{}' must not contain '/'",
                self.namespace
            )));
        }
        if self.timeout.is_zero() {
            return Err(CancellerError::Config("timeout must be non-zero".into()));
        }

        let url = self.base_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CancellerError::Config(format!(
                "apiURL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        Ok(())
    }

    /// Parsed API base URL.
    pub fn base_url(&self) -> Result<Url, CancellerError> {
        let raw = self.api_url.trim();
        Url::parse(raw).map_err(|source| CancellerError::InvalidUrl {
            url: raw.to_string(),
            source,
        })
    }
}
