//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! -L / -F flags ──▶ descriptor.rs (parse) ──▶ route_set.rs (RouteSet, BaseConfig)
//! -C document   ──▶ loader.rs (JSON/TOML) ──▶ BaseConfig::apply_document
//! no flags      ──▶ env.rs (EdgeEnv) ──▶ defaults.rs (edge topology)
//!                                              │
//!                                              ▼
//!                                BaseConfig (immutable from here on)
//! ```
//!
//! # Design Decisions
//! - No process-wide mutable state: `BaseConfig` is a value built once and
//!   moved into the router generator
//! - Environment is read once into `EdgeEnv`; synthesis depends on that value
//! - Document fields override flags only when present

pub mod defaults;
pub mod descriptor;
pub mod env;
pub mod loader;
pub mod route_set;

pub use descriptor::{Credentials, DescriptorError, NodeDescriptor, ProxyTarget};
pub use env::EdgeEnv;
pub use loader::{load_config, ConfigDocument, ConfigLoadError};
pub use route_set::{BaseConfig, Limits, LimitsError, NamedRouteGroup, RouteSet};
