//! build-canceller - cancel rogue OpenShift builds after a pipeline stage.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use build_canceller::config::{
    DEFAULT_API_URL, DEFAULT_BUILD_CONFIG, DEFAULT_NAMESPACE, DEFAULT_TOKEN_PATH,
    SERVICE_ACCOUNT_CA_PATH,
};
use build_canceller::{run_sweep, PipelineResult, SweepConfig, TlsPolicy};

/// Cancel builds still running in a namespace once the pipeline is done with it.
#[derive(Parser)]
#[command(name = "build-canceller")]
#[command(about = "Cancel non-terminal OpenShift builds left behind by a pipeline")]
struct Cli {
    /// OpenShift API base URL.
    #[arg(long, env = "OPENSHIFT_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Namespace to sweep.
    #[arg(long, short, env = "OPENSHIFT_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Bearer token; falls back to the mounted service account token when empty.
    #[arg(long, env = "OPENSHIFT_AUTH_TOKEN", default_value = "", hide_env_values = true)]
    auth_token: String,

    /// Build config owned by the triggering pipeline.
    #[arg(long, env = "OPENSHIFT_BUILD_CONFIG", default_value = DEFAULT_BUILD_CONFIG)]
    build_config: String,

    /// Only cancel builds labelled with --build-config.
    #[arg(long, default_value = "false")]
    scope_to_build_config: bool,

    /// Service account token file used when no token is given.
    #[arg(long, default_value = DEFAULT_TOKEN_PATH)]
    token_path: PathBuf,

    /// Extra PEM root certificate to trust.
    #[arg(long, conflicts_with_all = ["service_account_ca", "insecure_skip_tls_verify"])]
    ca_cert: Option<PathBuf>,

    /// Trust the mounted service account CA bundle.
    #[arg(long, default_value = "false", conflicts_with = "insecure_skip_tls_verify")]
    service_account_ca: bool,

    /// Accept any server certificate and hostname.
    #[arg(long, default_value = "false")]
    insecure_skip_tls_verify: bool,

    /// Result of the pipeline stage that just finished.
    #[arg(long, value_enum, default_value_t = PipelineResult::Success)]
    pipeline_result: PipelineResult,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

impl Cli {
    fn tls_policy(&self) -> TlsPolicy {
        if self.insecure_skip_tls_verify {
            TlsPolicy::Insecure
        } else if let Some(path) = &self.ca_cert {
            TlsPolicy::CustomCa(path.clone())
        } else if self.service_account_ca {
            TlsPolicy::CustomCa(PathBuf::from(SERVICE_ACCOUNT_CA_PATH))
        } else {
            TlsPolicy::Strict
        }
    }

    fn into_config(self) -> SweepConfig {
        let tls = self.tls_policy();
        SweepConfig {
            api_url: self.api_url,
            namespace: self.namespace,
            auth_token: self.auth_token,
            verbose: self.verbose,
            build_config_name: self.build_config,
            scope_to_build_config: self.scope_to_build_config,
            tls,
            token_path: self.token_path,
            pipeline_result: self.pipeline_result,
            ..SweepConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.into_config();
    info!(
        api_url = %config.api_url,
        namespace = %config.namespace,
        build_config = %config.build_config_name,
        tls = %config.tls,
        pipeline_result = %config.pipeline_result,
        "Sweeping namespace for active builds"
    );

    let outcome = run_sweep(&config).await;
    if let Some(failure) = outcome.failure {
        bail!(
            "Build sweep of namespace {} failed ({} error): {failure}",
            config.namespace,
            failure.kind()
        );
    }

    println!(
        "Cancelled {} build(s) in namespace {}: {}",
        outcome.cancelled.len(),
        config.namespace,
        outcome.cancelled.join(", ")
    );
    Ok(())
}
