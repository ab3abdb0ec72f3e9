//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use ngvpn_edge::config::RouteSet;
use ngvpn_edge::lifecycle::{launch, RouterHandle};
use ngvpn_edge::net::TlsIdentity;
use ngvpn_edge::routing::generate;
use ngvpn_edge::{BuiltinTransport, Router};

/// Start a TCP backend that echoes every byte back.
pub async fn start_echo_backend(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = socket.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });
}

/// Start an HTTP backend answering `"{name} {path}"` to every request.
pub async fn start_http_backend(addr: SocketAddr, name: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }

                let head = String::from_utf8_lossy(&head);
                let path = head.split_whitespace().nth(1).unwrap_or("?");
                let body = format!("{name} {path}");
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
}

/// Start a WebSocket backend that echoes text frames with a prefix.
pub async fn start_ws_echo_backend(addr: SocketAddr, prefix: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(socket).await else {
                    return;
                };
                while let Some(Ok(message)) = ws.next().await {
                    if message.is_text() {
                        let reply = format!("{prefix}{}", message.to_text().unwrap_or_default());
                        if ws.send(reply.into()).await.is_err() {
                            break;
                        }
                    }
                }
            });
        }
    });
}

/// Parse serve/chain descriptors into routers of one group.
pub fn routers(serve: &[&str], chain: &[&str]) -> Vec<Router> {
    let mut route = RouteSet::new();
    route
        .add_serve_nodes(serve)
        .unwrap()
        .add_chain_nodes(chain)
        .unwrap();
    generate(&route, "it").unwrap()
}

/// Launch routers on the built-in transport and give listeners time to bind.
pub async fn launch_builtin(routers: Vec<Router>, tls: Arc<TlsIdentity>) -> Vec<RouterHandle> {
    let transport = BuiltinTransport::default();
    let handles = launch(routers, &transport, tls);
    tokio::time::sleep(Duration::from_millis(300)).await;
    handles
}

pub fn identity() -> Arc<TlsIdentity> {
    Arc::new(TlsIdentity::generate().unwrap())
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
