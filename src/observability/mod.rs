//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, reloadable filter)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → diagnostics.rs (/debug/status, /debug/routers, /metrics)
//! ```
//!
//! # Design Decisions
//! - Metrics are cheap (atomic increments) and recorded unconditionally
//! - The diagnostic endpoint is opt-in and never affects routers

pub mod diagnostics;
pub mod logging;
pub mod metrics;

pub use diagnostics::DiagnosticsState;
pub use logging::{LogHandle, LoggingError, Verbosity};
