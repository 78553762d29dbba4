//! Integration tests for the TCP transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it
//! with either a [`TcpConnection`] client or a raw `TcpStream`, so the
//! exact bytes on the wire are checked as well as the framed API.

use std::time::Duration;

use gallows_transport::frame::{HEADER_WIDTH, MAX_PAYLOAD_LEN};
use gallows_transport::{Connection, TcpConnection, TcpTransport, Transport, TransportError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const NO_DELAY: Duration = Duration::ZERO;

/// Binds a transport on a random port and returns it with its address.
async fn listen() -> (TcpTransport, String) {
    let transport = TcpTransport::bind("127.0.0.1:0", 5)
        .await
        .expect("should bind")
        .with_frame_delay(NO_DELAY);
    let addr = transport.local_addr().unwrap().to_string();
    (transport, addr)
}

/// Accepts one server-side connection and connects one framed client.
async fn connected_pair() -> (TcpConnection, TcpConnection) {
    let (mut transport, addr) = listen().await;
    let server = tokio::spawn(async move { transport.accept().await.expect("accept") });
    let client = TcpConnection::connect(&addr, NO_DELAY).await.expect("connect");
    (server.await.unwrap(), client)
}

#[tokio::test]
async fn test_send_and_receive_both_directions() {
    let (server, client) = connected_pair().await;

    server.send(b"HI").await.unwrap();
    assert_eq!(client.recv().await.unwrap().unwrap(), b"HI");

    client.send(b"P=alice,2").await.unwrap();
    assert_eq!(server.recv().await.unwrap().unwrap(), b"P=alice,2");
}

#[tokio::test]
async fn test_empty_payload_round_trips() {
    let (server, client) = connected_pair().await;
    server.send(b"").await.unwrap();
    assert_eq!(client.recv().await.unwrap().unwrap(), b"");
}

#[tokio::test]
async fn test_wire_bytes_are_padded_header_then_payload() {
    let (mut transport, addr) = listen().await;
    let server = tokio::spawn(async move { transport.accept().await.unwrap() });
    let mut raw = TcpStream::connect(&addr).await.unwrap();
    let server = server.await.unwrap();

    server.send(b"START").await.unwrap();

    let mut header = [0u8; HEADER_WIDTH];
    raw.read_exact(&mut header).await.unwrap();
    let mut expected = [b' '; HEADER_WIDTH];
    expected[0] = b'5';
    assert_eq!(header, expected);

    let mut payload = [0u8; 5];
    raw.read_exact(&mut payload).await.unwrap();
    assert_eq!(&payload, b"START");
}

#[tokio::test]
async fn test_recv_returns_none_on_peer_close() {
    let (server, client) = connected_pair().await;
    client.close().await.unwrap();
    drop(client);
    assert!(server.recv().await.unwrap().is_none());
    assert!(server.is_closed());
}

#[tokio::test]
async fn test_malformed_header_is_rejected_and_closes() {
    let (mut transport, addr) = listen().await;
    let server = tokio::spawn(async move { transport.accept().await.unwrap() });
    let mut raw = TcpStream::connect(&addr).await.unwrap();
    let server = server.await.unwrap();

    raw.write_all(&[b'x'; HEADER_WIDTH]).await.unwrap();

    let result = server.recv().await;
    assert!(matches!(result, Err(TransportError::MalformedHeader(_))));
    assert!(server.is_closed());
    assert!(server.send(b"HB").await.is_err());
}

#[tokio::test]
async fn test_oversized_frame_is_rejected() {
    let (server, client) = connected_pair().await;
    let big = vec![b'a'; MAX_PAYLOAD_LEN + 1];
    assert!(matches!(
        client.send(&big).await,
        Err(TransportError::FrameTooLarge(_))
    ));
    // The refused frame was never written; the connection stays usable.
    client.send(b"G=a").await.unwrap();
    assert_eq!(server.recv().await.unwrap().unwrap(), b"G=a");
}

#[tokio::test]
async fn test_peer_hung_up_detects_closed_client() {
    let (server, client) = connected_pair().await;
    assert!(!server.peer_hung_up());

    client.close().await.unwrap();
    drop(client);

    // Give the FIN a moment to arrive.
    let mut hung_up = false;
    for _ in 0..50 {
        if server.peer_hung_up() {
            hung_up = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(hung_up, "server should notice the hang-up");
}

#[tokio::test]
async fn test_peer_hung_up_does_not_consume_data() {
    let (server, client) = connected_pair().await;
    client.send(b"AR=1").await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(!server.peer_hung_up());
    assert_eq!(server.recv().await.unwrap().unwrap(), b"AR=1");
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let (server, _client) = connected_pair().await;
    server.close().await.unwrap();
    server.close().await.unwrap();
    assert!(server.is_closed());
}

#[tokio::test]
async fn test_bind_failure_reports_address() {
    let (_transport, addr) = listen().await;
    // Same port, but reuseaddr does not allow two listeners.
    match TcpTransport::bind(&addr, 5).await {
        Err(TransportError::BindFailed { addr: reported, .. }) => {
            assert_eq!(reported, addr);
        }
        Ok(_) => panic!("second bind on {addr} should fail"),
        Err(other) => panic!("expected BindFailed, got {other}"),
    }
}
