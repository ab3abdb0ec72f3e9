//! Router generation.
//!
//! # Responsibilities
//! - Expand each serve node of a route set into runnable routers
//! - Resolve every scheme up front so nothing unknown reaches launch
//! - Aggregate the base route set and named groups in declaration order
//!
//! # Design Decisions
//! - The chain is shared by every serve node of a route set; it is not
//!   partitioned per listener
//! - A multiplexed serve node with N reverse-proxy targets yields N routers
//!   with the same listen binding
//! - Fail fast: the first error aborts generation; zero routers is an error

use thiserror::Error;

use crate::config::descriptor::NodeDescriptor;
use crate::config::route_set::{BaseConfig, RouteSet, BASE_GROUP};
use crate::routing::router::{Hop, Router};
use crate::routing::scheme::Scheme;

/// A descriptor could not be turned into a runnable router.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteGenerationError {
    #[error("route group {group:?}: unknown scheme {scheme:?} in {node}")]
    UnknownScheme {
        group: String,
        node: String,
        scheme: String,
    },

    #[error("route group {group:?}: chain nodes configured without any serve node")]
    MissingServeNode { group: String },

    #[error("invalid config: no routers to launch")]
    Empty,
}

/// Expand one route set. An empty set yields an empty list.
pub fn generate(route: &RouteSet, group: &str) -> Result<Vec<Router>, RouteGenerationError> {
    if route.serve_nodes().is_empty() && !route.chain_nodes().is_empty() {
        return Err(RouteGenerationError::MissingServeNode {
            group: group.to_string(),
        });
    }

    let chain = route
        .chain_nodes()
        .iter()
        .map(|node| resolve(node, group).map(|scheme| Hop::new(node.clone(), scheme)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut routers = Vec::with_capacity(route.serve_nodes().len());
    for (idx, node) in route.serve_nodes().iter().enumerate() {
        let scheme = resolve(node, group)?;
        let name = format!("{group}/{idx}");

        if node.is_multiplexed() {
            for target in node.targets() {
                routers.push(Router::new(
                    format!("{name}{}", target.path()),
                    node.clone(),
                    scheme,
                    chain.clone(),
                    Some(target.clone()),
                ));
            }
        } else {
            routers.push(Router::new(name, node.clone(), scheme, chain.clone(), None));
        }
    }

    Ok(routers)
}

/// Expand the base route set, then every named group, in order.
pub fn generate_all(config: &BaseConfig) -> Result<Vec<Router>, RouteGenerationError> {
    let mut routers = generate(&config.route, BASE_GROUP)?;
    for group in &config.routes {
        routers.extend(generate(&group.route, &group.name)?);
    }

    if routers.is_empty() {
        return Err(RouteGenerationError::Empty);
    }

    tracing::debug!(
        routers = routers.len(),
        groups = config.routes.len() + 1,
        "Routers generated"
    );
    Ok(routers)
}

fn resolve(node: &NodeDescriptor, group: &str) -> Result<Scheme, RouteGenerationError> {
    Scheme::resolve(node.scheme()).ok_or_else(|| RouteGenerationError::UnknownScheme {
        group: group.to_string(),
        node: format!("{}://{}", node.scheme(), node.authority()),
        scheme: node.scheme().to_string(),
    })
}
