//! ngvpn-edge
//!
//! Turns listen/forward node descriptors into independently serving routers.
//!
//! # Architecture Overview
//!
//! ```text
//!   -L/-F/-C flags ─┐
//!   environment ────┼─▶ config ──▶ routing ──▶ lifecycle::launch ──▶ transport (one task per router)
//!   (no flags:      │   RouteSet    Router[]         ▲
//!    edge topology)─┘                                │
//!                                  net::tls ─────────┘ (shared TLS identity)
//!
//!   observability: logging · metrics · diagnostics (PROFILING)
//!   lifecycle::reclaim: FREEMEM ticker
//! ```

use std::process::ExitCode;

use clap::Parser;

use ngvpn_edge::lifecycle::startup;
use ngvpn_edge::observability::logging::{self, Verbosity};
use ngvpn_edge::{Cli, EdgeEnv};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        println!("{}", Cli::version_line());
        println!("{}", Cli::usage());
        return ExitCode::SUCCESS;
    }

    let env = EdgeEnv::from_env();
    let edge_mode = !cli.has_explicit_input();

    let log = match logging::init(Verbosity::from_inputs(edge_mode, env.log_enabled, cli.debug)) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if edge_mode {
        println!("{}", Cli::version_line());
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), edge_mode, "ngvpn-edge starting");

    match startup::run(cli, env, log).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
