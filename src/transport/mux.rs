//! Path-routed HTTP reverse proxy for multiplexed serve nodes.
//!
//! # Responsibilities
//! - Share one listener between every router bound to the same address
//! - Route each request by longest matching sub-path to its backend
//! - Pass WebSocket upgrades through as raw byte tunnels
//!
//! # Data Flow
//! ```text
//! Router (path /a → http://b:1/ws) ─┐
//! Router (path /b → http://c:2/ws) ─┼─▶ SiteTable[bind addr] ─▶ MuxSite (one axum server)
//! Router (path /c → http://d:3/ws) ─┘
//!
//! GET /b?x ─▶ forward ─▶ http://c:2/ws?x
//!                  └─ 101 Switching Protocols ─▶ tunnel(client ⇄ backend)
//! ```
//!
//! # Design Decisions
//! - The first router to claim an address owns the listener; the others
//!   register their route and finish when that listener fails
//! - Unrouted paths get 404; upstream failures get 502
//! - Backends are plain HTTP; `https`/`wss` targets are refused at startup

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, uri::InvalidUri, HeaderMap, HeaderValue, Request, StatusCode, Uri, Version},
    response::{IntoResponse, Response},
};
use axum_server::tls_rustls::RustlsConfig;
use dashmap::{mapref::entry::Entry, DashMap};
use hyper::upgrade::OnUpgrade;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioIo},
};
use tokio::sync::watch;
use tokio_rustls::rustls::ServerConfig;
use tower_http::trace::TraceLayer;
use url::Url;

use crate::config::Limits;
use crate::net::TlsIdentity;
use crate::observability::metrics;
use crate::routing::Router;
use crate::transport::{connect_timeout, resolve_listen, ServeError};

/// Listener-sharing table, keyed by resolved bind address.
pub(crate) type SiteTable = Arc<DashMap<SocketAddr, Arc<MuxSite>>>;

/// One shared listener and the sub-path routes registered on it.
#[derive(Debug)]
pub(crate) struct MuxSite {
    addr: SocketAddr,
    routes: DashMap<String, Url>,
    client: Client<HttpConnector, Body>,
    /// `Some(reason)` once the listener has failed.
    failure: watch::Sender<Option<String>>,
}

impl MuxSite {
    fn new(addr: SocketAddr, limits: Limits) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout(limits)));
        connector.set_nodelay(true);

        Self {
            addr,
            routes: DashMap::new(),
            client: Client::builder(TokioExecutor::new()).build(connector),
            failure: watch::Sender::new(None),
        }
    }

    /// Longest registered sub-path matching `path`.
    fn lookup(&self, path: &str) -> Option<(String, Url)> {
        self.routes
            .iter()
            .filter(|entry| path_matches(entry.key(), path))
            .max_by_key(|entry| entry.key().len())
            .map(|entry| (entry.key().clone(), entry.value().clone()))
    }
}

pub(crate) async fn serve(
    router: Router,
    tls: Arc<TlsIdentity>,
    sites: SiteTable,
    limits: Limits,
) -> Result<(), ServeError> {
    let Some(target) = router.target().cloned() else {
        return Err(ServeError::Unsupported {
            scheme: router.scheme().to_string(),
            reason: "multiplexing needs a reverse-proxy target",
        });
    };
    if !matches!(target.url().scheme(), "http" | "ws") {
        return Err(ServeError::Unsupported {
            scheme: target.url().scheme().to_string(),
            reason: "reverse-proxy backends must be plain http or ws",
        });
    }

    let addr = resolve_listen(router.listen()).await?;
    let (site, owner) = match sites.entry(addr) {
        Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
        Entry::Vacant(entry) => {
            let site = Arc::new(MuxSite::new(addr, limits));
            entry.insert(Arc::clone(&site));
            (site, true)
        }
    };
    site.routes
        .insert(target.path().to_string(), target.url().clone());

    tracing::info!(
        router = %router.name(),
        listen = %addr,
        path = %target.path(),
        backend = %target.url(),
        "Route registered"
    );

    if !owner {
        return follow(&site).await;
    }

    let server_config = router.requires_tls().then(|| tls.server_config());
    let result = run_site(Arc::clone(&site), server_config).await;
    if let Err(e) = &result {
        site.failure.send_replace(Some(e.to_string()));
    }
    result
}

/// Wait on a listener owned by another router.
async fn follow(site: &MuxSite) -> Result<(), ServeError> {
    let mut failure = site.failure.subscribe();
    let reason = match failure.wait_for(Option::is_some).await {
        Ok(current) => current.clone().unwrap_or_default(),
        Err(_) => "listener closed".to_string(),
    };
    Err(ServeError::SharedListener {
        addr: site.addr,
        reason,
    })
}

async fn run_site(site: Arc<MuxSite>, tls: Option<Arc<ServerConfig>>) -> Result<(), ServeError> {
    let addr = site.addr;
    let bind_error = |source| ServeError::Bind {
        addr: addr.to_string(),
        source,
    };
    let listener = std::net::TcpListener::bind(addr).map_err(bind_error)?;
    listener.set_nonblocking(true).map_err(bind_error)?;

    let app = axum::Router::new()
        .fallback(forward)
        .with_state(site)
        .layer(TraceLayer::new_for_http());

    tracing::info!(listen = %addr, tls = tls.is_some(), "Multiplexed listener started");

    let served = match tls {
        Some(config) => {
            let mut config = ServerConfig::clone(&config);
            config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
            axum_server::from_tcp_rustls(listener, RustlsConfig::from_config(Arc::new(config)))
                .serve(app.into_make_service())
                .await
        }
        None => {
            axum_server::from_tcp(listener)
                .serve(app.into_make_service())
                .await
        }
    };

    served.map_err(|source| ServeError::Stopped { addr, source })
}

async fn forward(State(site): State<Arc<MuxSite>>, mut request: Request<Body>) -> Response {
    let path = request.uri().path().to_string();

    let Some((prefix, target)) = site.lookup(&path) else {
        tracing::debug!(listen = %site.addr, path = %path, "No route matched");
        metrics::record_mux_request(StatusCode::NOT_FOUND.as_u16());
        return (StatusCode::NOT_FOUND, "No matching route found").into_response();
    };

    let uri = match upstream_uri(&target, &prefix, request.uri()) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(path = %path, backend = %target, error = %e, "Invalid upstream URI");
            metrics::record_mux_request(StatusCode::BAD_GATEWAY.as_u16());
            return (StatusCode::BAD_GATEWAY, "Invalid upstream URI").into_response();
        }
    };

    let client_upgrade = is_upgrade(request.headers()).then(|| hyper::upgrade::on(&mut request));

    if let Some(host) = uri.authority().and_then(|a| HeaderValue::from_str(a.as_str()).ok()) {
        request.headers_mut().insert(header::HOST, host);
    }
    *request.uri_mut() = uri;
    *request.version_mut() = Version::HTTP_11;

    match site.client.request(request).await {
        Ok(mut response) => {
            let status = response.status();
            if status == StatusCode::SWITCHING_PROTOCOLS {
                if let Some(client_upgrade) = client_upgrade {
                    let upstream_upgrade = hyper::upgrade::on(&mut response);
                    tokio::spawn(tunnel(client_upgrade, upstream_upgrade, path));
                }
            }

            metrics::record_mux_request(status.as_u16());
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::warn!(path = %path, backend = %target, error = %e, "Upstream error");
            metrics::record_upstream_error();
            metrics::record_mux_request(StatusCode::BAD_GATEWAY.as_u16());
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

async fn tunnel(client: OnUpgrade, upstream: OnUpgrade, path: String) {
    let (client, upstream) = match tokio::try_join!(client, upstream) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::debug!(path = %path, error = %e, "Upgrade failed");
            return;
        }
    };

    let mut client = TokioIo::new(client);
    let mut upstream = TokioIo::new(upstream);
    match tokio::io::copy_bidirectional(&mut client, &mut upstream).await {
        Ok((sent, received)) => {
            tracing::debug!(path = %path, sent, received, "Tunnel closed");
        }
        Err(e) => {
            tracing::debug!(path = %path, error = %e, "Tunnel ended with error");
        }
    }
}

fn is_upgrade(headers: &HeaderMap) -> bool {
    headers.contains_key(header::UPGRADE)
}

/// `prefix` matches whole path segments only: `/a` matches `/a` and `/a/x`, not `/ab`.
fn path_matches(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

/// Rewrite a request URI onto the backend: the matched prefix is replaced by
/// the backend path and the query string is kept.
fn upstream_uri(target: &Url, prefix: &str, uri: &Uri) -> Result<Uri, InvalidUri> {
    let mut upstream = target.clone();
    let _ = upstream.set_scheme("http");

    let rest = uri.path()[prefix.len()..].trim_start_matches('/');
    if !rest.is_empty() {
        let path = format!("{}/{}", target.path().trim_end_matches('/'), rest);
        upstream.set_path(&path);
    }
    upstream.set_query(uri.query());

    Uri::try_from(upstream.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(target: &str, prefix: &str, request: &str) -> String {
        let target = Url::parse(target).unwrap();
        upstream_uri(&target, prefix, &request.parse().unwrap())
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_path_matches_whole_segments() {
        assert!(path_matches("/a", "/a"));
        assert!(path_matches("/a", "/a/x"));
        assert!(!path_matches("/a", "/ab"));
        assert!(!path_matches("/a", "/"));
        assert!(path_matches("/a/", "/a/x"));
    }

    #[test]
    fn test_upstream_uri_replaces_prefix() {
        assert_eq!(
            rewrite("http://localhost:2054/ws", "/mws", "/mws"),
            "http://localhost:2054/ws"
        );
        assert_eq!(
            rewrite("http://localhost:2054/ws", "/mws", "/mws/sub?x=1"),
            "http://localhost:2054/ws/sub?x=1"
        );
        assert_eq!(
            rewrite("ws://127.0.0.1:9000/", "/a", "/a/b"),
            "http://127.0.0.1:9000/b"
        );
    }

    #[test]
    fn test_longest_prefix_wins() {
        let site = MuxSite::new("127.0.0.1:0".parse().unwrap(), Limits::default());
        site.routes
            .insert("/a".into(), Url::parse("http://short:1/").unwrap());
        site.routes
            .insert("/a/deep".into(), Url::parse("http://long:2/").unwrap());

        let (prefix, url) = site.lookup("/a/deep/x").unwrap();
        assert_eq!(prefix, "/a/deep");
        assert_eq!(url.host_str(), Some("long"));

        let (prefix, _) = site.lookup("/a/other").unwrap();
        assert_eq!(prefix, "/a");
        assert!(site.lookup("/b").is_none());
    }

    #[tokio::test]
    async fn test_follower_reports_owner_failure() {
        let site = MuxSite::new("127.0.0.1:1".parse().unwrap(), Limits::default());
        site.failure.send_replace(Some("boom".into()));

        let err = follow(&site).await.unwrap_err();
        assert!(matches!(err, ServeError::SharedListener { ref reason, .. } if reason == "boom"));
    }
}
