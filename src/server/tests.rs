//! Tests for the HTTP server implementation.

#[cfg(test)]
mod server_tests {
    use std::io::{self, Cursor};
    use std::pin::Pin;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
    use tokio::sync::{mpsc, Semaphore};
    use tokio::task::JoinSet;
    use tokio::time;
    use log::debug;

    use crate::parser::Method;
    use crate::router::Router;
    use crate::server::{Error, HttpResponse, HttpServer, ServerConfig, StatusCode};

    // Mock TcpStream for testing
    struct MockTcpStream {
        read_data: Cursor<Vec<u8>>,
        write_data: Vec<u8>,
        chunk: usize,
    }

    impl MockTcpStream {
        fn new(read_data: Vec<u8>) -> Self {
            Self {
                read_data: Cursor::new(read_data),
                write_data: Vec::new(),
                chunk: usize::MAX,
            }
        }

        /// Deliver at most `chunk` bytes per read, like a slow peer.
        fn chunked(read_data: Vec<u8>, chunk: usize) -> Self {
            Self { chunk, ..Self::new(read_data) }
        }

        fn written(&self) -> String {
            String::from_utf8_lossy(&self.write_data).into_owned()
        }
    }

    impl AsyncRead for MockTcpStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            let unfilled = buf.initialize_unfilled();
            let len = unfilled.len().min(this.chunk);
            let n = std::io::Read::read(&mut this.read_data, &mut unfilled[..len])?;
            buf.advance(n);
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for MockTcpStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let this = self.get_mut();
            this.write_data.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn test_config() -> ServerConfig {
        ServerConfig {
            read_buffer_size: 1024,
            max_body_size: 64,
            ..ServerConfig::default()
        }
    }

    async fn test_server() -> HttpServer {
        let server = HttpServer::new(test_config());
        server.add_route(Method::GET, "/test", |_req| async {
            Ok(HttpResponse::new(StatusCode::Ok)
                .with_content_type("text/plain")
                .with_body_string("Test response"))
        }).await;
        server.add_route(Method::POST, "/test", |req| async move {
            Ok(HttpResponse::new(StatusCode::Created).with_body_bytes(req.body))
        }).await;
        server.add_route(Method::GET, "/users/:id", |req| async move {
            Ok(HttpResponse::new(StatusCode::Ok).with_body_string(format!("user {}", req.param("id"))))
        }).await;
        server
    }

    async fn roundtrip(server: &HttpServer, request: &[u8]) -> (Result<(), Error>, String) {
        let mut stream = MockTcpStream::new(request.to_vec());
        let result = HttpServer::handle_connection(&mut stream, server.router(), &server.config, None).await;
        (result, stream.written())
    }

    #[tokio::test]
    async fn test_server_creation() {
        let config = ServerConfig {
            max_connections: 100,
            read_buffer_size: 4096,
            ..ServerConfig::default()
        };

        let server = HttpServer::new(config.clone());
        assert_eq!(server.config.addr, config.addr);
        assert_eq!(server.config.max_connections, 100);
        assert_eq!(server.config.read_buffer_size, 4096);
        assert_eq!(server.config.max_body_size, 1024 * 1024);
    }

    #[tokio::test]
    async fn test_add_route() {
        let server = HttpServer::new(ServerConfig::default());
        server.add_route(Method::GET, "/test", |_req| async {
            Ok(HttpResponse::new(StatusCode::Ok))
        }).await;

        let routes = server.router().read().await.routes();
        assert_eq!(routes, vec![(Method::GET, "/test".to_string())]);
    }

    #[tokio::test]
    async fn test_with_router() {
        let mut router = Router::default();
        router.get("/ping", |_req| async { Ok(HttpResponse::new(StatusCode::Ok).with_body_string("pong")) });
        let server = HttpServer::with_router(test_config(), router);

        let (result, response) = roundtrip(&server, b"GET /ping HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(result.is_ok());
        assert!(response.ends_with("pong"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_valid_request() {
        let server = test_server().await;
        let (result, response) = roundtrip(&server, b"GET /test HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Type: text/plain\r\n"));
        assert!(response.contains("Connection: close\r\n"));
        assert!(response.contains("Test response"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_route_param() {
        let server = test_server().await;
        let (result, response) = roundtrip(&server, b"GET /users/42 HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with("user 42"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_not_found() {
        let server = test_server().await;
        let (result, response) = roundtrip(&server, b"GET /nonexistent HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_method_not_allowed() {
        let server = test_server().await;
        let (result, response) = roundtrip(&server, b"DELETE /test HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
        assert!(response.contains("Allow: GET, POST, HEAD\r\n"));
    }

    #[tokio::test]
    async fn test_handle_connection_head_has_no_body() {
        let server = test_server().await;
        let (result, response) = roundtrip(&server, b"HEAD /test HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_invalid_request() {
        let server = test_server().await;
        let (result, response) = roundtrip(&server, b"INVALID REQUEST").await;

        assert!(matches!(result, Err(Error::ParseError(_))));
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(response.contains("Error parsing request:"));
    }

    #[tokio::test]
    async fn test_handle_connection_empty_stream() {
        let server = test_server().await;
        let (result, response) = roundtrip(&server, b"").await;

        assert!(result.is_ok());
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn test_handle_connection_reads_body_in_chunks() {
        let server = test_server().await;
        let request = b"POST /test HTTP/1.1\r\nHost: localhost\r\nContent-Length: 11\r\n\r\nhello world";
        let mut stream = MockTcpStream::chunked(request.to_vec(), 7);

        let result = HttpServer::handle_connection(&mut stream, server.router(), &server.config, None).await;
        assert!(result.is_ok());
        let response = stream.written();
        assert!(response.starts_with("HTTP/1.1 201 Created\r\n"));
        assert!(response.ends_with("\r\n\r\nhello world"));
    }

    #[tokio::test]
    async fn test_handle_connection_body_too_large() {
        let server = test_server().await;
        let request = b"POST /test HTTP/1.1\r\nHost: localhost\r\nContent-Length: 1000\r\n\r\n";
        let (result, response) = roundtrip(&server, request).await;

        assert!(matches!(result, Err(Error::PayloadTooLarge { size: 1000, limit: 64 })));
        assert!(response.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
    }

    #[tokio::test]
    async fn test_handle_connection_head_too_large() {
        let server = test_server().await;
        let mut request = b"GET /test HTTP/1.1\r\nHost: localhost\r\nX-Filler: ".to_vec();
        request.extend(std::iter::repeat(b'a').take(2048));
        request.extend_from_slice(b"\r\n\r\n");
        let (result, response) = roundtrip(&server, &request).await;

        assert!(matches!(
            result,
            Err(Error::ParseError(crate::parser::Error::HeadTooLarge { limit: 1024 }))
        ));
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[tokio::test]
    async fn test_handle_connection_invalid_content_length() {
        let server = test_server().await;
        let request = b"POST /test HTTP/1.1\r\nHost: localhost\r\nContent-Length: lots\r\n\r\n";
        let (result, response) = roundtrip(&server, request).await;

        assert!(matches!(result, Err(Error::ParseError(_))));
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[tokio::test]
    async fn test_handler_error_becomes_500() {
        let server = test_server().await;
        server.add_route(Method::GET, "/broken", |_req| async {
            Err(Error::InternalError("database unavailable".to_string()))
        }).await;

        let (result, response) = roundtrip(&server, b"GET /broken HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(response.contains(r#"{"error":"Internal Server Error"}"#));
        assert!(!response.contains("database unavailable"));
    }

    #[tokio::test]
    async fn test_handler_not_found_error_becomes_404() {
        let server = test_server().await;
        server.add_route(Method::GET, "/items/:id", |req| async move {
            Err(Error::NotFound(req.param("id").to_string()))
        }).await;

        let (_, response) = roundtrip(&server, b"GET /items/7 HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_500() {
        let server = test_server().await;
        server.add_route(Method::GET, "/panic", |_req| async {
            if true {
                panic!("handler exploded");
            }
            Ok(HttpResponse::new(StatusCode::Ok))
        }).await;

        let (result, response) = roundtrip(&server, b"GET /panic HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[tokio::test]
    async fn test_remote_addr_is_set() {
        let server = test_server().await;
        server.add_route(Method::GET, "/whoami", |req| async move {
            let addr = req.remote_addr.map(|a| a.to_string()).unwrap_or_default();
            Ok(HttpResponse::new(StatusCode::Ok).with_body_string(addr))
        }).await;

        let mut stream = MockTcpStream::new(b"GET /whoami HTTP/1.1\r\nHost: localhost\r\n\r\n".to_vec());
        let addr = "10.0.0.1:4000".parse().ok();
        HttpServer::handle_connection(&mut stream, server.router(), &server.config, addr)
            .await
            .unwrap();
        assert!(stream.written().ends_with("10.0.0.1:4000"));
    }

    #[tokio::test]
    async fn test_multiple_routes() {
        let server = HttpServer::new(test_config());
        server.add_route(Method::GET, "/route1", |_req| async {
            Ok(HttpResponse::new(StatusCode::Ok).with_body_string("Route 1"))
        }).await;
        server.add_route(Method::POST, "/route2", |_req| async {
            Ok(HttpResponse::new(StatusCode::Created).with_body_string("Route 2"))
        }).await;

        let (result1, response1) = roundtrip(&server, b"GET /route1 HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(result1.is_ok());
        assert!(response1.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response1.contains("Route 1"));

        let (result2, response2) = roundtrip(&server, b"POST /route2 HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(result2.is_ok());
        assert!(response2.starts_with("HTTP/1.1 201 Created\r\n"));
        assert!(response2.contains("Route 2"));
    }

    #[tokio::test]
    async fn test_connection_limiting() {
        let max_connections = 2;
        let semaphore = Arc::new(Semaphore::new(max_connections));
        let active_connections = Arc::new(AtomicUsize::new(0));

        async fn handle_connection(
            semaphore: Arc<Semaphore>,
            active_connections: Arc<AtomicUsize>,
            connection_id: usize,
        ) -> Result<(), String> {
            let permit = match semaphore.try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => return Err(format!("Connection {connection_id} rejected: limit reached")),
            };

            let count = active_connections.fetch_add(1, Ordering::SeqCst) + 1;
            debug!("Connection {connection_id} accepted. Active connections: {count}");
            time::sleep(Duration::from_millis(10)).await;
            active_connections.fetch_sub(1, Ordering::SeqCst);

            drop(permit);
            Ok(())
        }

        let mut handles = vec![];
        for i in 0..max_connections {
            handles.push(tokio::spawn(handle_connection(semaphore.clone(), active_connections.clone(), i)));
        }

        time::sleep(Duration::from_millis(5)).await;
        let reject_handle = tokio::spawn(handle_connection(semaphore.clone(), active_connections.clone(), max_connections));

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        let reject_result = reject_handle.await.unwrap();
        assert!(reject_result.unwrap_err().contains("limit reached"));
        assert_eq!(active_connections.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_server_connection_limit_response() {
        let mut socket = MockTcpStream::new(Vec::new());
        let response = HttpResponse::new(StatusCode::ServiceUnavailable)
            .with_content_type("text/plain")
            .with_body_string("Server is at capacity, please try again later");
        socket.write_all(&response.to_bytes()).await.unwrap();

        let response = socket.written();
        assert!(response.starts_with("HTTP/1.1 503 Service Unavailable\r\n"));
        assert!(response.contains("Content-Type: text/plain\r\n"));
        assert!(response.contains("Server is at capacity, please try again later"));
    }

    #[tokio::test]
    async fn test_shutdown_signal() {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let shutdown_received = Arc::new(AtomicBool::new(false));
        let shutdown_received_clone = shutdown_received.clone();

        let server_handle = tokio::spawn(async move {
            let mut tasks = JoinSet::new();
            for i in 0..3 {
                tasks.spawn(async move {
                    time::sleep(Duration::from_millis(50)).await;
                    debug!("Task {i} completed");
                });
            }

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    shutdown_received_clone.store(true, Ordering::SeqCst);
                }
                _ = time::sleep(Duration::from_secs(5)) => {
                    panic!("Test timed out waiting for shutdown signal");
                }
            }

            while let Some(res) = tasks.join_next().await {
                assert!(res.is_ok(), "Task failed: {res:?}");
            }
        });

        time::sleep(Duration::from_millis(10)).await;
        shutdown_tx.send(()).await.expect("Failed to send shutdown signal");
        server_handle.await.expect("Server task failed");

        assert!(shutdown_received.load(Ordering::SeqCst), "Shutdown signal was not received");
    }
}
