//! Runnable routers.
//!
//! A `Router` is one listen binding plus the forward chain it relays
//! through, and for multiplexed serve nodes the single backend target it
//! owns. Fields are fixed at construction and there is no shared mutable
//! state between routers.

use std::fmt;

use crate::config::descriptor::{NodeDescriptor, ProxyTarget};
use crate::routing::scheme::Scheme;

/// One resolved forward hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    node: NodeDescriptor,
    scheme: Scheme,
}

impl Hop {
    pub(crate) fn new(node: NodeDescriptor, scheme: Scheme) -> Self {
        Self { node, scheme }
    }

    pub fn node(&self) -> &NodeDescriptor {
        &self.node
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }
}

impl fmt::Display for Hop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.node.scheme(), self.node.authority())
    }
}

/// A fully resolved listener + chain pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Router {
    name: String,
    listen: NodeDescriptor,
    scheme: Scheme,
    chain: Vec<Hop>,
    target: Option<ProxyTarget>,
}

impl Router {
    pub(crate) fn new(
        name: String,
        listen: NodeDescriptor,
        scheme: Scheme,
        chain: Vec<Hop>,
        target: Option<ProxyTarget>,
    ) -> Self {
        Self {
            name,
            listen,
            scheme,
            chain,
            target,
        }
    }

    /// Stable name for logs and metrics, e.g. `base/0` or `base/0/ws`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn listen(&self) -> &NodeDescriptor {
        &self.listen
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Forward hops in order; empty for direct serving.
    pub fn chain(&self) -> &[Hop] {
        &self.chain
    }

    pub fn first_hop(&self) -> Option<&Hop> {
        self.chain.first()
    }

    /// Backend target of a multiplexed serve node.
    pub fn target(&self) -> Option<&ProxyTarget> {
        self.target.as_ref()
    }

    pub fn requires_tls(&self) -> bool {
        self.scheme.transport.requires_tls()
    }
}

impl fmt::Display for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}://{}",
            self.name,
            self.listen.scheme(),
            self.listen.authority()
        )?;
        if let Some(target) = &self.target {
            write!(f, " {} => {}", target.path(), target.url())?;
        }
        for hop in &self.chain {
            write!(f, " -> {hop}")?;
        }
        Ok(())
    }
}
