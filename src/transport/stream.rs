//! TCP passthrough.
//!
//! # Data Flow
//! ```text
//! Client ──TCP──▶ Listener (permit) ──[TLS accept]──▶ copy_bidirectional ◀──TCP── chain hop
//! ```
//!
//! # Design Decisions
//! - Only one-hop chains reach this module
//! - Bytes are piped unmodified; the hop speaks whatever protocol it speaks
//! - TLS is terminated with the shared identity when the listen scheme needs it
//! - A failing connection is logged at debug level and never ends the router

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{copy_bidirectional, AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsAcceptor;

use crate::config::Limits;
use crate::net::{Listener, ListenerError, TlsIdentity};
use crate::observability::metrics;
use crate::routing::Router;
use crate::transport::{connect_timeout, resolve_listen, ServeError};

const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub(crate) async fn serve(
    router: Router,
    tls: Arc<TlsIdentity>,
    limits: Limits,
) -> Result<(), ServeError> {
    let Some(hop) = router.first_hop() else {
        return Err(ServeError::Unsupported {
            scheme: router.scheme().to_string(),
            reason: "passthrough needs a forward chain",
        });
    };
    let upstream: Arc<str> = hop.node().connect_addr().into();

    let addr = resolve_listen(router.listen()).await?;
    let listener = Listener::bind(&addr.to_string(), limits.max_connections)
        .await
        .map_err(|e| match e {
            ListenerError::Bind { addr, source } => ServeError::Bind { addr, source },
            other => ServeError::Bind {
                addr: addr.to_string(),
                source: std::io::Error::other(other),
            },
        })?;

    let acceptor = router
        .requires_tls()
        .then(|| TlsAcceptor::from(tls.server_config()));
    let timeout = connect_timeout(limits);
    let name: Arc<str> = router.name().into();
    let local = listener.local_addr().unwrap_or(addr);

    tracing::info!(
        router = %name,
        listen = %local,
        upstream = %upstream,
        tls = acceptor.is_some(),
        "Router listening"
    );

    loop {
        let (stream, peer, permit) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(router = %name, error = %e, "Accept failed");
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                continue;
            }
        };

        let acceptor = acceptor.clone();
        let upstream = Arc::clone(&upstream);
        let name = Arc::clone(&name);
        tokio::spawn(async move {
            let _permit = permit;
            let started = Instant::now();
            metrics::record_connection_opened();

            let (sent, received) = match relay(stream, acceptor, &upstream, timeout).await {
                Ok(counts) => counts,
                Err(e) => {
                    tracing::debug!(
                        router = %name,
                        peer = %peer,
                        error = %e,
                        "Relay ended with error"
                    );
                    (0, 0)
                }
            };

            metrics::record_connection_closed(sent, received);
            tracing::debug!(
                router = %name,
                peer = %peer,
                sent,
                received,
                duration_ms = started.elapsed().as_millis() as u64,
                "Connection closed"
            );
        });
    }
}

async fn relay(
    inbound: TcpStream,
    acceptor: Option<TlsAcceptor>,
    upstream: &str,
    timeout: Duration,
) -> std::io::Result<(u64, u64)> {
    let outbound = match tokio::time::timeout(timeout, TcpStream::connect(upstream)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            metrics::record_upstream_error();
            return Err(e);
        }
        Err(_) => {
            metrics::record_upstream_error();
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("connect to {upstream} timed out"),
            ));
        }
    };

    outbound.set_nodelay(true)?;

    match acceptor {
        Some(acceptor) => pipe(acceptor.accept(inbound).await?, outbound).await,
        None => pipe(inbound, outbound).await,
    }
}

async fn pipe<A, B>(mut a: A, mut b: B) -> std::io::Result<(u64, u64)>
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    copy_bidirectional(&mut a, &mut b).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteSet;
    use crate::routing::generate;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn echo_backend() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let (mut r, mut w) = stream.split();
                    let _ = tokio::io::copy(&mut r, &mut w).await;
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_relays_to_first_hop() {
        let backend = echo_backend().await;
        let mut route = RouteSet::new();
        route
            .add_serve_node("tcp://127.0.0.1:28301")
            .unwrap()
            .add_chain_node(&format!("http://{backend}"))
            .unwrap();
        let router = generate(&route, "test").unwrap().remove(0);
        let tls = Arc::new(TlsIdentity::generate().unwrap());

        tokio::spawn(serve(router, tls, Limits::default()));
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut client = TcpStream::connect("127.0.0.1:28301").await.unwrap();
        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
    }

    #[tokio::test]
    async fn test_bind_conflict_ends_router() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let mut route = RouteSet::new();
        route
            .add_serve_node(&format!("tcp://127.0.0.1:{port}"))
            .unwrap()
            .add_chain_node("http://127.0.0.1:1")
            .unwrap();
        let router = generate(&route, "test").unwrap().remove(0);
        let tls = Arc::new(TlsIdentity::generate().unwrap());

        let err = serve(router, tls, Limits::default()).await.unwrap_err();
        assert_eq!(err.kind(), "bind");
    }
}
