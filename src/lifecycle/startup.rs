//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the configuration from flags, an optional document and the environment
//! - Compile routers and bootstrap the TLS identity
//! - Start auxiliary tasks (diagnostics, memory reclamation)
//! - Launch every router, then park
//!
//! # Design Decisions
//! - Fail fast: every fatal error happens before any listener is bound
//! - Steps run in a fixed order, not concurrently
//! - Routers start last (traffic only when ready)

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::cli::Cli;
use crate::config::defaults::synthesize;
use crate::config::{
    load_config, BaseConfig, ConfigLoadError, DescriptorError, EdgeEnv, LimitsError,
};
use crate::lifecycle::launch::{launch, RouterHandle};
use crate::lifecycle::reclaim;
use crate::net::{TlsBootstrapError, TlsIdentity, DEFAULT_CERT_FILE, DEFAULT_KEY_FILE};
use crate::observability::{
    diagnostics, metrics, DiagnosticsState, LogHandle, LoggingError, Verbosity,
};
use crate::routing::{generate_all, RouteGenerationError, Router};
use crate::transport::BuiltinTransport;

/// A fatal startup failure. Reported once; the process exits with status 1.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Config(#[from] ConfigLoadError),

    #[error(transparent)]
    Limits(#[from] LimitsError),

    #[error(transparent)]
    Routes(#[from] RouteGenerationError),

    #[error(transparent)]
    Tls(#[from] TlsBootstrapError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("-P {addr} requires the PROFILING environment variable")]
    ProfilingDisabled { addr: String },
}

/// Flags, then the document, then the edge topology when no flag was given.
///
/// Limits are checked last, so no listener is bound with values it cannot serve.
pub fn build_config(cli: &Cli, env: &EdgeEnv) -> Result<BaseConfig, StartupError> {
    if let (Some(addr), false) = (&cli.profiling_addr, env.profiling) {
        return Err(StartupError::ProfilingDisabled { addr: addr.clone() });
    }

    let mut config = BaseConfig::from_flags(&cli.listen, &cli.forward, cli.debug)?;

    if let Some(path) = &cli.config {
        let document = load_config(path)?;
        config.apply_document(&document)?;
        tracing::info!(path = %path.display(), "Configuration document loaded");
    }

    if !cli.has_explicit_input() {
        synthesize(&mut config.route, env)?;
    }

    config.limits.validate()?;
    Ok(config)
}

/// Run every startup step and launch the routers.
pub async fn start(
    cli: &Cli,
    env: &EdgeEnv,
    log: &LogHandle,
) -> Result<Vec<RouterHandle>, StartupError> {
    let config = build_config(cli, env)?;
    if config.debug && !cli.debug {
        log.set_verbosity(Verbosity::Debug)?;
    }

    let routers = generate_all(&config)?;
    let tls = Arc::new(TlsIdentity::bootstrap(
        Path::new(DEFAULT_CERT_FILE),
        Path::new(DEFAULT_KEY_FILE),
    )?);

    start_auxiliary(cli, env, &routers);

    let transport = BuiltinTransport::new(config.limits);
    Ok(launch(routers, &transport, tls))
}

/// Start, then hold the router handles for the life of the process.
pub async fn run(cli: Cli, env: EdgeEnv, log: LogHandle) -> Result<(), StartupError> {
    let handles = start(&cli, &env, &log).await?;
    tracing::info!(routers = handles.len(), "Startup complete");

    let _handles = handles;
    std::future::pending::<()>().await;
    Ok(())
}

fn start_auxiliary(cli: &Cli, env: &EdgeEnv, routers: &[Router]) {
    if env.profiling {
        let recorder = match metrics::install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "Prometheus recorder unavailable");
                None
            }
        };
        let addr = cli
            .profiling_addr
            .as_deref()
            .unwrap_or(diagnostics::DEFAULT_ADDR);
        diagnostics::spawn(addr, DiagnosticsState::new(routers, recorder));
    }

    if let Some(raw) = &env.free_mem {
        reclaim::spawn_from_env(raw);
    }
}
