//! Passthrough routers: bytes flow to the first chain hop.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::rustls::{self, pki_types::ServerName, ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

mod common;

#[tokio::test]
async fn test_plain_relay_through_chain_hop() {
    let hop_addr: SocketAddr = "127.0.0.1:28401".parse().unwrap();
    let listen_addr: SocketAddr = "127.0.0.1:28402".parse().unwrap();
    common::start_echo_backend(hop_addr).await;

    let routers = common::routers(
        &[&format!("tcp://{listen_addr}")],
        &[&format!("http://{hop_addr}")],
    );
    let _handles = common::launch_builtin(routers, common::identity()).await;

    let mut client = TcpStream::connect(listen_addr).await.expect("Router unreachable");
    client.write_all(b"hello through the chain").await.unwrap();

    let mut buf = vec![0u8; 23];
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hello through the chain");
}

#[tokio::test]
async fn test_tls_router_terminates_with_shared_identity() {
    let hop_addr: SocketAddr = "127.0.0.1:28403".parse().unwrap();
    let listen_addr: SocketAddr = "127.0.0.1:28404".parse().unwrap();
    common::start_echo_backend(hop_addr).await;

    let identity = common::identity();
    let routers = common::routers(
        &[&format!("tls://{listen_addr}")],
        &[&format!("socks5://{hop_addr}")],
    );
    let _handles = common::launch_builtin(routers, Arc::clone(&identity)).await;

    let mut roots = RootCertStore::empty();
    roots.add(identity.certificates()[0].clone()).unwrap();
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));

    let tcp = TcpStream::connect(listen_addr).await.expect("Router unreachable");
    let mut tls = connector
        .connect(ServerName::try_from("localhost").unwrap(), tcp)
        .await
        .expect("TLS handshake failed");

    tls.write_all(b"secret").await.unwrap();
    let mut buf = [0u8; 6];
    tls.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"secret");
}

#[tokio::test]
async fn test_unreachable_hop_closes_client_only() {
    let listen_addr: SocketAddr = "127.0.0.1:28405".parse().unwrap();

    // Nothing listens on the hop address.
    let routers = common::routers(&[&format!("tcp://{listen_addr}")], &["http://127.0.0.1:28406"]);
    let handles = common::launch_builtin(routers, common::identity()).await;

    for _ in 0..2 {
        let mut client = TcpStream::connect(listen_addr).await.expect("Router unreachable");
        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).await.unwrap_or(0), 0);
    }
    assert!(!handles[0].is_finished());
}
