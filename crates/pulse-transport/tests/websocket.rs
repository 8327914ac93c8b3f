//! Integration tests for the WebSocket connector.
//!
//! These tests spin up a real loopback WebSocket server and dial it with
//! [`WebSocketConnector`] to verify bytes actually cross the network.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use pulse_transport::{
        Connector, Link, TransportError, WebSocketConnector,
    };
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;

    type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

    /// Binds a listener on a random port. Returns it with its `ws://` URL.
    async fn bind() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = listener.local_addr().expect("should have addr");
        (listener, format!("ws://{addr}"))
    }

    async fn accept(listener: &TcpListener) -> ServerWs {
        let (stream, _) = listener.accept().await.expect("should accept");
        tokio_tungstenite::accept_async(stream)
            .await
            .expect("should upgrade")
    }

    #[tokio::test]
    async fn test_websocket_connect_and_send_receive() {
        let (listener, url) = bind().await;
        let server = tokio::spawn(async move { accept(&listener).await });

        let connector = WebSocketConnector::new(url);
        let link = connector.connect().await.expect("should connect");
        let mut server_ws = server.await.expect("task should complete");

        assert!(link.id().into_inner() > 0);

        // --- Client sends, server receives ---
        link.send(b"hello from client").await.expect("send should work");
        let msg = server_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"hello from client");

        // --- Server sends text, client receives bytes ---
        server_ws
            .send(Message::Text("hello from server".into()))
            .await
            .unwrap();
        let received = link
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, b"hello from server");

        link.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_server_close() {
        let (listener, url) = bind().await;
        let server = tokio::spawn(async move { accept(&listener).await });

        let link = WebSocketConnector::new(url).connect().await.unwrap();
        let mut server_ws = server.await.unwrap();

        server_ws.send(Message::Close(None)).await.unwrap();

        let result = link.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on server close");
    }

    #[tokio::test]
    async fn test_websocket_connect_to_closed_port_fails() {
        // Bind then drop, so the port is (almost certainly) closed.
        let (listener, url) = bind().await;
        drop(listener);

        let result = WebSocketConnector::new(url).connect().await;
        assert!(matches!(result, Err(TransportError::ConnectFailed(_))));
    }
}
