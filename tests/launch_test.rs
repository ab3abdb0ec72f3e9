//! Launch sequencing against the built-in transport.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use ngvpn_edge::lifecycle::RouterFailure;
use ngvpn_edge::ServeError;

mod common;

#[tokio::test]
async fn test_failing_router_does_not_stop_siblings() {
    let hop_addr: SocketAddr = "127.0.0.1:28441".parse().unwrap();
    common::start_echo_backend(hop_addr).await;

    // Hold 28443 so the third router cannot bind.
    let _occupied = TcpListener::bind("127.0.0.1:28443").await.unwrap();

    let hop = format!("http://{hop_addr}");
    let mut routers = common::routers(&["tcp://127.0.0.1:28442"], &[&hop]);
    routers.extend(common::routers(&["quic://127.0.0.1:28444"], &[]));
    routers.extend(common::routers(&["tcp://127.0.0.1:28443"], &[&hop]));

    let mut handles = common::launch_builtin(routers, common::identity()).await;
    assert_eq!(handles.len(), 3);

    let bind_failure = handles.remove(2);
    let quic_failure = handles.remove(1);

    let err = tokio::time::timeout(Duration::from_secs(5), quic_failure.join())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, RouterFailure::Serve(ServeError::Unsupported { .. })));

    let err = tokio::time::timeout(Duration::from_secs(5), bind_failure.join())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, RouterFailure::Serve(ServeError::Bind { .. })));

    // The healthy sibling still relays.
    assert!(!handles[0].is_finished());
    let mut client = TcpStream::connect("127.0.0.1:28442").await.expect("Sibling unreachable");
    client.write_all(b"alive").await.unwrap();
    let mut buf = [0u8; 5];
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"alive");
}

#[tokio::test]
async fn test_shared_listener_failure_reaches_every_router() {
    let _occupied = TcpListener::bind("127.0.0.1:28451").await.unwrap();

    let node = concat!(
        "relay+ws://127.0.0.1:28451",
        "?reverseproxy=/a@http://127.0.0.1:1/ws,/b@http://127.0.0.1:2/ws"
    );
    let handles = common::launch_builtin(common::routers(&[node], &[]), common::identity()).await;
    assert_eq!(handles.len(), 2);

    for handle in handles {
        let result = tokio::time::timeout(Duration::from_secs(5), handle.join())
            .await
            .unwrap();
        assert!(matches!(
            result,
            Err(RouterFailure::Serve(ServeError::Bind { .. } | ServeError::SharedListener { .. }))
        ));
    }
}

#[tokio::test]
async fn test_two_hop_chain_is_refused_not_truncated() {
    let first_hop = TcpListener::bind("127.0.0.1:28461").await.unwrap();
    let second_hop = TcpListener::bind("127.0.0.1:28462").await.unwrap();

    let routers = common::routers(
        &["tcp://127.0.0.1:28463"],
        &["http://127.0.0.1:28461", "socks5://127.0.0.1:28462"],
    );
    let mut handles = common::launch_builtin(routers, common::identity()).await;

    let err = tokio::time::timeout(Duration::from_secs(5), handles.remove(0).join())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, RouterFailure::Serve(ServeError::Unsupported { .. })));

    // Nothing listens on the serve address, and neither hop was dialed.
    assert!(TcpStream::connect("127.0.0.1:28463").await.is_err());
    for hop in [&first_hop, &second_hop] {
        let accepted = tokio::time::timeout(Duration::from_millis(100), hop.accept()).await;
        assert!(accepted.is_err());
    }
}
