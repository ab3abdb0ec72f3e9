//! Command line.

use std::path::PathBuf;

use clap::{CommandFactory, Parser};

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "ngvpn-edge")]
#[command(about = "Multi-protocol relay edge", long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Forward address, repeat to build a forward chain
    #[arg(short = 'F', value_name = "NODE")]
    pub forward: Vec<String>,

    /// Listen address, repeat to listen on multiple ports
    #[arg(short = 'L', value_name = "NODE")]
    pub listen: Vec<String>,

    /// Configuration file (.json or .toml)
    #[arg(short = 'C', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'D')]
    pub debug: bool,

    /// Print version and exit
    #[arg(short = 'V')]
    pub version: bool,

    /// Diagnostic HTTP endpoint address (needs PROFILING)
    #[arg(short = 'P', value_name = "ADDR")]
    pub profiling_addr: Option<String>,
}

impl Cli {
    /// True when any flag was given. Without one the edge topology is synthesized.
    pub fn has_explicit_input(&self) -> bool {
        !self.forward.is_empty()
            || !self.listen.is_empty()
            || self.config.is_some()
            || self.debug
            || self.version
            || self.profiling_addr.is_some()
    }

    /// `ngvpn-edge <version> (<os>/<arch>)`
    pub fn version_line() -> String {
        format!(
            "{} {} ({}/{})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH
        )
    }

    /// Flag summary printed after the version line.
    pub fn usage() -> String {
        Self::command().render_help().to_string()
    }
}
