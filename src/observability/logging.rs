//! Structured logging.
//!
//! # Responsibilities
//! - Install the global `tracing` subscriber once, at process start
//! - Derive the initial level from `-D`, edge mode and `LOG`
//! - Allow raising verbosity later (a config document may set `debug`)
//!
//! # Design Decisions
//! - `RUST_LOG` wins over every computed level, including later changes
//! - Edge mode is silent unless `LOG` is set

use thiserror::Error;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, util::TryInitError, EnvFilter,
    Registry,
};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to install log subscriber: {0}")]
    Init(#[from] TryInitError),

    #[error("failed to change log filter: {0}")]
    Reload(#[from] reload::Error),
}

/// How much the process logs when `RUST_LOG` is not set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Silent,
    Info,
    Debug,
}

impl Verbosity {
    pub fn from_inputs(edge_mode: bool, log_enabled: bool, debug: bool) -> Self {
        if debug {
            Self::Debug
        } else if edge_mode && !log_enabled {
            Self::Silent
        } else {
            Self::Info
        }
    }

    pub fn directive(self) -> &'static str {
        match self {
            Self::Silent => "off",
            Self::Info => "info",
            Self::Debug => "info,ngvpn_edge=debug,tower_http=debug",
        }
    }
}

/// Handle to the installed subscriber's filter.
#[derive(Clone)]
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    env_override: bool,
}

impl LogHandle {
    /// Swap the active filter. A no-op when `RUST_LOG` is in charge.
    pub fn set_verbosity(&self, verbosity: Verbosity) -> Result<(), LoggingError> {
        if self.env_override {
            return Ok(());
        }
        self.filter.reload(EnvFilter::new(verbosity.directive()))?;
        tracing::debug!(filter = verbosity.directive(), "Log filter changed");
        Ok(())
    }
}

/// Install the global subscriber.
pub fn init(verbosity: Verbosity) -> Result<LogHandle, LoggingError> {
    let (filter, env_override) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(verbosity.directive()), false),
    };
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()?;

    Ok(LogHandle {
        filter: handle,
        env_override,
    })
}
