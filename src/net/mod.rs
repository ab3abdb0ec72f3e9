//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Router listen address
//!     → listener.rs (bind, accept loop, connection limits)
//!     → tls.rs (process-wide identity, handshake when the scheme needs it)
//!     → Hand off to the transport
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - One TLS identity is bootstrapped before launch and shared read-only

pub mod listener;
pub mod tls;

pub use listener::{ConnectionPermit, Listener, ListenerError};
pub use tls::{
    IdentitySource, TlsBootstrapError, TlsIdentity, TlsLoadError, DEFAULT_CERT_FILE,
    DEFAULT_KEY_FILE,
};
