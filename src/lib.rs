//! ngvpn-edge library: startup orchestration for a multi-protocol relay.

// Core subsystems
pub mod config;
pub mod net;
pub mod routing;
pub mod transport;

// Cross-cutting concerns
pub mod cli;
pub mod lifecycle;
pub mod observability;

pub use cli::Cli;
pub use config::{BaseConfig, EdgeEnv};
pub use lifecycle::{RouterHandle, StartupError};
pub use routing::Router;
pub use transport::{BuiltinTransport, ServeError, Transport};
