//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! BaseConfig (base RouteSet + named groups)
//!     → scheme.rs (resolve protocol+transport of every node)
//!     → generator.rs (one Router per serve node, or per reverse-proxy target)
//!     → Vec<Router> handed to the launch sequencer
//! ```
//!
//! # Design Decisions
//! - Routers are compiled once at startup and never change
//! - Unknown schemes are rejected here, before any listener exists
//! - Zero routers is a configuration error, not a silent no-op

pub mod generator;
pub mod router;
pub mod scheme;

pub use generator::{generate, generate_all, RouteGenerationError};
pub use router::{Hop, Router};
pub use scheme::{Protocol, Scheme, TransportKind};
