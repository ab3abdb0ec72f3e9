//! Default "edge" topology.
//!
//! Used only when the process is started without any flag. One public
//! multiplexed relay fronts five loopback listeners:
//!
//! ```text
//! :PORT  relay+ws  path=/WSPATH
//!          /MWSPATH      -> http://localhost:2054/ws   (relay+mws 127.0.0.1:2054)
//!          /WSSOCKSPATH  -> http://localhost:2055/ws   (ws        127.0.0.1:2055)
//!          /MWSSOCKSPATH -> http://localhost:2056/ws   (mws       127.0.0.1:2056)
//!                                                      (h2c       127.0.0.1:2057)
//!                                                      (quic      127.0.0.1:2058)
//! ```

use crate::config::descriptor::DescriptorError;
use crate::config::env::EdgeEnv;
use crate::config::route_set::RouteSet;

/// The six serve descriptors of the edge topology, in launch order.
pub fn edge_topology(env: &EdgeEnv) -> Vec<String> {
    let creds = env.credential_prefix();
    vec![
        format!(
            "relay+ws://{creds}:{port}?path=/{ws}&reverseproxy=/{mws}@http://localhost:2054/ws,/{ws_socks}@http://localhost:2055/ws,/{mws_socks}@http://localhost:2056/ws",
            port = env.port,
            ws = env.ws_path,
            mws = env.mws_path,
            ws_socks = env.ws_socks_path,
            mws_socks = env.mws_socks_path,
        ),
        format!("relay+mws://{creds}127.0.0.1:2054"),
        format!("ws://{creds}127.0.0.1:2055"),
        format!("mws://{creds}127.0.0.1:2056"),
        format!("h2c://{creds}127.0.0.1:2057"),
        format!("quic://{creds}127.0.0.1:2058"),
    ]
}

/// Append the edge topology to `route` as serve nodes.
///
/// All-or-nothing: a bad override (e.g. a non-numeric `PORT`) appends nothing.
pub fn synthesize(route: &mut RouteSet, env: &EdgeEnv) -> Result<(), DescriptorError> {
    route.add_serve_nodes(edge_topology(env))?;
    tracing::debug!(
        port = %env.port,
        serve_nodes = route.serve_nodes().len(),
        "Synthesized default edge topology"
    );
    Ok(())
}
