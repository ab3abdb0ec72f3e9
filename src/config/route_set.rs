//! Route sets and the process-wide base configuration.
//!
//! # Responsibilities
//! - Accumulate serve nodes (listeners) and chain nodes (forward hops)
//! - Hold the base route set, named route groups, debug flag and limits
//! - Apply a structured document on top of command-line input
//!
//! # Design Decisions
//! - Every add parses first and mutates second: a parse failure leaves the
//!   set exactly as it was
//! - Batch adds are all-or-nothing
//! - `BaseConfig` is built once at startup and then moved into the router
//!   generator; nothing mutates it afterwards

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::descriptor::{DescriptorError, NodeDescriptor};
use crate::config::loader::ConfigDocument;

/// Name of the route group built from `-L`/`-F` and top-level document fields.
pub const BASE_GROUP: &str = "base";

/// Ordered serve nodes plus the chain they all forward through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteSet {
    chain_nodes: Vec<NodeDescriptor>,
    serve_nodes: Vec<NodeDescriptor>,
}

impl RouteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and append one forward hop.
    pub fn add_chain_node(&mut self, spec: &str) -> Result<&mut Self, DescriptorError> {
        let node = NodeDescriptor::parse(spec)?;
        self.chain_nodes.push(node);
        Ok(self)
    }

    /// Parse and append one listener.
    pub fn add_serve_node(&mut self, spec: &str) -> Result<&mut Self, DescriptorError> {
        let node = NodeDescriptor::parse(spec)?;
        self.serve_nodes.push(node);
        Ok(self)
    }

    /// Append several forward hops; nothing is appended unless all parse.
    pub fn add_chain_nodes<I, S>(&mut self, specs: I) -> Result<&mut Self, DescriptorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let nodes = parse_all(specs)?;
        self.chain_nodes.extend(nodes);
        Ok(self)
    }

    /// Append several listeners; nothing is appended unless all parse.
    pub fn add_serve_nodes<I, S>(&mut self, specs: I) -> Result<&mut Self, DescriptorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let nodes = parse_all(specs)?;
        self.serve_nodes.extend(nodes);
        Ok(self)
    }

    pub fn chain_nodes(&self) -> &[NodeDescriptor] {
        &self.chain_nodes
    }

    pub fn serve_nodes(&self) -> &[NodeDescriptor] {
        &self.serve_nodes
    }

    pub fn is_empty(&self) -> bool {
        self.chain_nodes.is_empty() && self.serve_nodes.is_empty()
    }
}

fn parse_all<I, S>(specs: I) -> Result<Vec<NodeDescriptor>, DescriptorError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    specs
        .into_iter()
        .map(|spec| NodeDescriptor::parse(spec.as_ref()))
        .collect()
}

/// An additional route group declared in a config document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRouteGroup {
    pub name: String,
    pub route: RouteSet,
}

/// Connection limits for the built-in transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum concurrent connections per listener (backpressure).
    pub max_connections: usize,

    /// Upstream connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_connections: 10_000,
            connect_timeout_secs: 5,
        }
    }
}

/// A limit no listener can honor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitsError {
    #[error("invalid config: max_connections must be between 1 and {max}, got {value}")]
    MaxConnections { value: usize, max: usize },

    #[error("invalid config: connect_timeout_secs must be at least 1")]
    ConnectTimeout,
}

impl Limits {
    /// Reject limits that would leave a bound listener unable to serve.
    pub fn validate(&self) -> Result<(), LimitsError> {
        if self.max_connections == 0 || self.max_connections > Semaphore::MAX_PERMITS {
            return Err(LimitsError::MaxConnections {
                value: self.max_connections,
                max: Semaphore::MAX_PERMITS,
            });
        }
        if self.connect_timeout_secs == 0 {
            return Err(LimitsError::ConnectTimeout);
        }
        Ok(())
    }
}

/// Everything the router generator needs, built once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseConfig {
    pub route: RouteSet,
    pub routes: Vec<NamedRouteGroup>,
    pub debug: bool,
    pub limits: Limits,
}

impl BaseConfig {
    /// Start from command-line style input: listen nodes, forward nodes, debug.
    pub fn from_flags<L, F>(listen: L, forward: F, debug: bool) -> Result<Self, DescriptorError>
    where
        L: IntoIterator,
        L::Item: AsRef<str>,
        F: IntoIterator,
        F::Item: AsRef<str>,
    {
        let mut route = RouteSet::new();
        route.add_serve_nodes(listen)?.add_chain_nodes(forward)?;
        Ok(Self {
            route,
            debug,
            ..Self::default()
        })
    }

    /// Overlay a config document.
    ///
    /// Fields present in the document replace the current values; absent
    /// fields keep them. On error `self` is unchanged.
    pub fn apply_document(&mut self, doc: &ConfigDocument) -> Result<(), DescriptorError> {
        let mut route = self.route.clone();

        if let Some(serve_nodes) = &doc.serve_nodes {
            route.serve_nodes = parse_all(serve_nodes)?;
        }
        if let Some(chain_nodes) = &doc.chain_nodes {
            route.chain_nodes = parse_all(chain_nodes)?;
        }

        let routes = match &doc.routes {
            Some(groups) => groups
                .iter()
                .enumerate()
                .map(|(idx, group)| -> Result<NamedRouteGroup, DescriptorError> {
                    let mut set = RouteSet::new();
                    set.add_serve_nodes(&group.serve_nodes)?
                        .add_chain_nodes(&group.chain_nodes)?;
                    Ok(NamedRouteGroup {
                        name: group
                            .name
                            .clone()
                            .unwrap_or_else(|| format!("route-{}", idx + 1)),
                        route: set,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => self.routes.clone(),
        };

        self.route = route;
        self.routes = routes;
        if let Some(debug) = doc.debug {
            self.debug = debug;
        }
        if let Some(limits) = doc.limits {
            self.limits = limits;
        }
        Ok(())
    }

    /// True when no group declares any node at all.
    pub fn is_empty(&self) -> bool {
        self.route.is_empty() && self.routes.iter().all(|group| group.route.is_empty())
    }
}
