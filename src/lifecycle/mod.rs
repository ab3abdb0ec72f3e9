//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     CLI/env → config → synthesize defaults → generate routers
//!         → TLS bootstrap → auxiliary tasks → launch → park
//!
//! Launch (launch.rs):
//!     one task per router, one RouterHandle per task
//!
//! Reclaim (reclaim.rs):
//!     FREEMEM ticker → allocator release
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, routers last
//! - No shutdown path: the process runs until killed

pub mod launch;
pub mod reclaim;
pub mod startup;

pub use launch::{launch, RouterFailure, RouterHandle};
pub use startup::{build_config, run, start, StartupError};
