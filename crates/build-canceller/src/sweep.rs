//! One bounded cancellation sweep over a namespace.
//!
//! The sweep moves `Init -> Listing -> Cancelling -> Done`. Builds are handled
//! one at a time in listing order. The first failed cancellation stops the
//! sweep; cancellations already issued stay in effect.

use tracing::{debug, error, info};

use crate::builds::{Build, BuildClient};
use crate::config::SweepConfig;
use crate::credentials::resolve_token;
use crate::error::CancellerError;
use crate::transport::{HttpTransport, Transport};

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    Init,
    Listing,
    Cancelling,
    Done,
}

/// Result of one sweep.
#[derive(Debug)]
pub struct SweepOutcome {
    /// True when listing and every cancellation succeeded.
    pub success: bool,
    /// First failure, if any.
    pub failure: Option<CancellerError>,
    /// Builds cancelled, in order.
    pub cancelled: Vec<String>,
    /// Builds left alone (terminal, or outside the build config scope).
    pub skipped: Vec<String>,
    /// Human-readable decision trace; empty unless verbose.
    pub trace: Vec<String>,
}

impl SweepOutcome {
    fn failed(error: CancellerError, trace: TraceLog) -> Self {
        Self {
            success: false,
            failure: Some(error),
            cancelled: Vec::new(),
            skipped: Vec::new(),
            trace: trace.lines,
        }
    }
}

/// Verbose-only trace lines, mirrored to `tracing` at debug level.
#[derive(Debug, Default)]
pub struct TraceLog {
    verbose: bool,
    lines: Vec<String>,
}

impl TraceLog {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            lines: Vec::new(),
        }
    }

    pub fn note(&mut self, line: impl FnOnce() -> String) {
        if self.verbose {
            let line = line();
            debug!("{line}");
            self.lines.push(line);
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// Drives the listing and cancellation phases of a sweep.
pub struct SweepOrchestrator<'a, T: Transport + ?Sized> {
    config: &'a SweepConfig,
    transport: &'a T,
    state: SweepState,
    trace: TraceLog,
}

impl<'a, T: Transport + ?Sized> SweepOrchestrator<'a, T> {
    /// Create an orchestrator that talks through `transport`.
    pub fn new(config: &'a SweepConfig, transport: &'a T) -> Self {
        Self::with_trace(config, transport, TraceLog::new(config.verbose))
    }

    /// Create an orchestrator that continues an existing trace.
    pub fn with_trace(config: &'a SweepConfig, transport: &'a T, trace: TraceLog) -> Self {
        Self {
            config,
            transport,
            state: SweepState::Init,
            trace,
        }
    }

    /// Current state.
    pub fn state(&self) -> SweepState {
        self.state
    }

    fn transition(&mut self, next: SweepState) {
        debug!(from = ?self.state, to = ?next, "Sweep state transition");
        self.state = next;
    }

    /// Run the sweep to completion.
    pub async fn run(&mut self) -> SweepOutcome {
        let mut cancelled = Vec::new();
        let mut skipped = Vec::new();
        let failure = self.sweep(&mut cancelled, &mut skipped).await.err();
        self.transition(SweepState::Done);

        let success = failure.is_none();
        match &failure {
            None => info!(
                namespace = %self.config.namespace,
                cancelled = cancelled.len(),
                skipped = skipped.len(),
                "Build sweep finished"
            ),
            Some(e) => error!(
                namespace = %self.config.namespace,
                kind = %e.kind(),
                error = %e,
                cancelled = cancelled.len(),
                "Build sweep failed"
            ),
        }

        SweepOutcome {
            success,
            failure,
            cancelled,
            skipped,
            trace: std::mem::take(&mut self.trace.lines),
        }
    }

    async fn sweep(
        &mut self,
        cancelled: &mut Vec<String>,
        skipped: &mut Vec<String>,
    ) -> Result<(), CancellerError> {
        let base_url = self.config.base_url()?;
        let client = BuildClient::new(self.transport, base_url, self.config.namespace.clone());

        self.transition(SweepState::Listing);
        let (builds, body) = client.list_with_body().await?;
        self.trace.note(|| format!("listing response {body}"));

        self.transition(SweepState::Cancelling);
        for build in builds {
            self.trace.note(|| format!("observed build {}", build.document));

            if !self.in_scope(&build) {
                skipped.push(build.name);
                continue;
            }

            if !build.class().is_active() {
                self.trace.note(|| format!("build {} is {}, leaving it", build.name, build.phase));
                skipped.push(build.name);
                continue;
            }

            // Only active builds are addressed by name.
            if build.name.is_empty() {
                self.trace.note(|| format!("active build has no name: {}", build.document));
                return Err(CancellerError::MissingField("metadata.name".into()));
            }

            self.trace.note(|| {
                format!("found active build {} (phase {:?})", build.name, build.phase)
            });

            match client.cancel(&build.name).await {
                Ok(c) => {
                    self.trace.note(|| format!("status before cancel {}", c.status_before));
                    self.trace.note(|| format!("status after cancel {}", c.status_after));
                    self.trace.note(|| format!("update response {}", c.response));
                    cancelled.push(c.name);
                }
                Err(e) => {
                    self.trace.note(|| format!("cancelling {} failed: {e}", build.name));
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    fn in_scope(&mut self, build: &Build) -> bool {
        if !self.config.scope_to_build_config {
            return true;
        }
        let wanted = self.config.build_config_name.as_str();
        if build.build_config() == Some(wanted) {
            return true;
        }
        self.trace.note(|| {
            format!("build {} not from build config {wanted}, leaving it", build.name)
        });
        false
    }
}

/// Run a full sweep: resolve the credential, build the transport, then
/// list and cancel.
pub async fn run_sweep(config: &SweepConfig) -> SweepOutcome {
    let mut trace = TraceLog::new(config.verbose);
    if config.pipeline_result.succeeded() {
        trace.note(|| "pipeline stage succeeded".to_string());
    } else {
        trace.note(|| format!("pipeline stage did not succeed ({})", config.pipeline_result));
    }

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid sweep configuration");
        return SweepOutcome::failed(e, trace);
    }

    let token = resolve_token(&config.auth_token, &config.token_path);
    trace.note(|| format!("using {}", token.source));

    let transport = match HttpTransport::with_timeout(token.token, &config.tls, config.timeout) {
        Ok(transport) => transport,
        Err(e) => {
            error!(error = %e, "Failed to create HTTP transport");
            return SweepOutcome::failed(e, trace);
        }
    };

    SweepOrchestrator::with_trace(config, &transport, trace)
        .run()
        .await
}
