//! Post-pipeline cleanup of rogue OpenShift builds.
//!
//! After a CI stage finishes, its builds may still be running on the cluster
//! because the pipeline failed, was aborted, or simply stopped waiting. This
//! crate sweeps a namespace once, finds every build whose phase is not
//! terminal, and cancels it with a read-modify-write update against the
//! OpenShift REST API.
//!
//! # Example
//!
//! ```rust,ignore
//! use build_canceller::{run_sweep, SweepConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SweepConfig::new("https://api.cluster.example:6443", "demo");
//!     let outcome = run_sweep(&config).await;
//!     if !outcome.success {
//!         anyhow::bail!("sweep failed: {:?}", outcome.failure);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod builds;
pub mod config;
pub mod credentials;
pub mod error;
pub mod phase;
pub mod sweep;
pub mod transport;

pub use builds::{Build, BuildClient};
pub use config::{PipelineResult, SweepConfig, TlsPolicy};
pub use credentials::{resolve_token, CredentialSource, ResolvedToken};
pub use error::{CancellerError, ErrorKind};
pub use phase::{classify, PhaseClass};
pub use sweep::{run_sweep, SweepOrchestrator, SweepOutcome, SweepState};
pub use transport::{HttpTransport, Transport};
