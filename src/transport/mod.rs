//! Pluggable transport abstraction.
//!
//! The launch sequencer hands each `Router` to a `Transport`, which owns the
//! wire protocol from bind onwards. `BuiltinTransport` is the one shipped
//! with the crate:
//!
//! ```text
//! Router
//!     ├─ quic / kcp          → Unsupported
//!     ├─ two or more hops    → Unsupported
//!     ├─ target and a chain  → Unsupported
//!     ├─ has a target        → mux.rs (path-routed HTTP reverse proxy,
//!     │                         one shared listener per bind address)
//!     └─ has a chain         → stream.rs (TCP passthrough to the first hop,
//!                               optional TLS termination)
//! ```
//!
//! # Design Decisions
//! - A serve error belongs to its router alone; nothing escalates
//! - The listener-sharing table lives in the transport value, never in a Router

pub mod mux;
pub mod stream;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::config::{Limits, NodeDescriptor};
use crate::net::TlsIdentity;
use crate::routing::Router;

/// Per-router failure. Reported through the router's handle.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("cannot resolve listen address {addr}: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{scheme} routers are not supported: {reason}")]
    Unsupported { scheme: String, reason: &'static str },

    #[error("listener {addr} stopped: {source}")]
    Stopped {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("shared listener {addr} failed: {reason}")]
    SharedListener { addr: SocketAddr, reason: String },
}

impl ServeError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Resolve { .. } => "resolve",
            Self::Bind { .. } => "bind",
            Self::Unsupported { .. } => "unsupported",
            Self::Stopped { .. } => "stopped",
            Self::SharedListener { .. } => "shared_listener",
        }
    }
}

/// Serves one router until it fails. Success never returns in practice.
pub trait Transport: Send + Sync + 'static {
    fn serve(
        &self,
        router: Router,
        tls: Arc<TlsIdentity>,
    ) -> BoxFuture<'static, Result<(), ServeError>>;
}

/// The transport shipped with the crate.
#[derive(Debug, Clone, Default)]
pub struct BuiltinTransport {
    limits: Limits,
    sites: mux::SiteTable,
}

impl BuiltinTransport {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            sites: mux::SiteTable::default(),
        }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }
}

impl Transport for BuiltinTransport {
    fn serve(
        &self,
        router: Router,
        tls: Arc<TlsIdentity>,
    ) -> BoxFuture<'static, Result<(), ServeError>> {
        let this = self.clone();
        Box::pin(async move {
            let scheme = router.scheme();
            let unsupported = |reason| ServeError::Unsupported {
                scheme: scheme.to_string(),
                reason,
            };

            if scheme.transport.is_datagram() {
                return Err(unsupported(
                    "UDP transports need an external protocol implementation",
                ));
            }
            if router.chain().len() > 1 {
                return Err(unsupported(
                    "multi-hop forward chains need an external protocol implementation",
                ));
            }

            match (router.target().is_some(), router.first_hop().is_some()) {
                (true, true) => Err(unsupported(
                    "multiplexed targets cannot be reached through a forward chain",
                )),
                (true, false) => mux::serve(router, tls, this.sites, this.limits).await,
                (false, true) => stream::serve(router, tls, this.limits).await,
                (false, false) => Err(unsupported(
                    "direct serving without a forward chain needs an external protocol implementation",
                )),
            }
        })
    }
}

/// Resolve a listen descriptor to the socket address to bind.
pub(crate) async fn resolve_listen(node: &NodeDescriptor) -> Result<SocketAddr, ServeError> {
    let addr = node.bind_addr();
    let first = match tokio::net::lookup_host(addr.clone()).await {
        Ok(mut resolved) => resolved.next(),
        Err(source) => return Err(ServeError::Resolve { addr, source }),
    };

    first.ok_or_else(|| ServeError::Resolve {
        addr,
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"),
    })
}

pub(crate) fn connect_timeout(limits: Limits) -> Duration {
    Duration::from_secs(limits.connect_timeout_secs)
}
