//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it
//! with a `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;
    use turnstile_transport::{Connection, Transport, WebSocketConnection, WebSocketTransport};

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on a random port, connects one client, and returns both ends.
    async fn connected_pair() -> (WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have local addr");

        let server = tokio::spawn(async move { transport.accept().await.expect("should accept") });
        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let conn = server.await.expect("accept task should complete");
        (conn, client)
    }

    #[tokio::test]
    async fn test_websocket_text_round_trip() {
        let (conn, mut client) = connected_pair().await;
        assert!(conn.id().into_inner() > 0);
        assert!(conn.peer_addr().ip().is_loopback());

        conn.send(br#"{"id":1}"#).await.expect("send should succeed");
        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "utf-8 payloads go out as text frames");
        assert_eq!(msg.into_data().as_ref(), br#"{"id":1}"#);

        client.send(Message::text("from client")).await.unwrap();
        let received = conn.recv().await.expect("recv should succeed");
        assert_eq!(received.as_deref(), Some(b"from client".as_slice()));

        conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_binary_frames_are_accepted() {
        let (conn, mut client) = connected_pair().await;

        client
            .send(Message::binary(vec![0xde, 0xad, 0xbe, 0xef]))
            .await
            .unwrap();

        let received = conn.recv().await.unwrap();
        assert_eq!(received, Some(vec![0xde, 0xad, 0xbe, 0xef]));
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (conn, mut client) = connected_pair().await;

        client.send(Message::Close(None)).await.unwrap();

        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_connection_ids_are_unique() {
        let (a, _ca) = connected_pair().await;
        let (b, _cb) = connected_pair().await;

        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_bind_address_in_use_returns_error() {
        let first = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = first.local_addr().unwrap().to_string();

        let second = WebSocketTransport::bind(&addr).await;

        assert!(second.is_err());
    }
}
