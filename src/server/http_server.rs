//! HTTP server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::{mpsc, RwLock, Semaphore};
use tokio::task::JoinSet;
use log::{debug, error, info, warn};

use crate::parser::{content_length, find_head_end, parse_request, Error as ParserError, HttpRequest, Method};
use crate::router::Router;
use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::response::{HttpResponse, StatusCode};

const BANNER: &str = r"
   ____           _
  / ___|   _  ___| | ___  _ __  ___
 | |  | | | |/ __| |/ _ \| '_ \/ __|
 | |__| |_| | (__| | (_) | |_) \__ \
  \____\__, |\___|_|\___/| .__/|___/
       |___/             |_|
";

/// An HTTP server dispatching requests through a [`Router`].
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    /// The router. Each request is answered from a snapshot taken when it
    /// arrives, so routes can be added while the server runs.
    router: Arc<RwLock<Router>>,
}

impl HttpServer {
    /// Create a new HTTP server with an empty router.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_router(config, Router::default())
    }

    /// Create a server around an existing router.
    pub fn with_router(config: ServerConfig, router: Router) -> Self {
        Self {
            config,
            router: Arc::new(RwLock::new(router)),
        }
    }

    /// Shared handle to the router.
    pub fn router(&self) -> Arc<RwLock<Router>> {
        self.router.clone()
    }

    /// Add a route to the server.
    ///
    /// # Panics
    ///
    /// Panics if the pattern is invalid.
    pub async fn add_route<F, Fut>(&self, method: Method, path: &str, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.router.write().await.register(method, path, handler);
    }

    /// Display the server banner and registered endpoints.
    async fn display_server_info(&self) {
        info!("{BANNER}");

        let router = self.router.read().await;
        info!("Registered endpoints:");
        for (method, pattern) in router.routes() {
            info!("  {method} {pattern}");
        }
        for files in router.static_mounts() {
            info!("  GET, HEAD {} (static)", files.prefix());
        }
    }

    /// Set up the TCP listener.
    async fn setup_listener(&self) -> Result<TcpListener, Error> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        info!("Server listening on http://{addr}", addr = self.config.addr);
        Ok(listener)
    }

    /// Set up a Ctrl+C handler for graceful shutdown.
    fn setup_ctrl_c_handler(shutdown_tx: mpsc::Sender<()>, tasks: &mut JoinSet<()>) {
        tasks.spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                    let _ = shutdown_tx.send(()).await;
                }
                Err(e) => {
                    error!("Error setting up Ctrl+C handler: {e}");
                }
            }
        });
    }

    /// Handle a new connection.
    async fn handle_new_connection(
        mut socket: tokio::net::TcpStream,
        addr: SocketAddr,
        semaphore: Arc<Semaphore>,
        router: Arc<RwLock<Router>>,
        config: ServerConfig,
        tasks: &mut JoinSet<()>,
    ) {
        let permit = match semaphore.try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Connection limit reached, rejecting connection from {addr}");
                let response = HttpResponse::new(StatusCode::ServiceUnavailable)
                    .with_content_type("text/plain")
                    .with_body_string("Server is at capacity, please try again later");
                let _ = socket.write_all(&response.to_bytes()).await;
                return;
            }
        };

        tasks.spawn(async move {
            // Released when the connection is done
            let _permit = permit;

            if let Err(e) = Self::handle_connection(&mut socket, router, &config, Some(addr)).await {
                warn!("Error handling connection from {addr}: {e}");
            }
        });
    }

    /// Handle connection errors.
    async fn handle_connection_error(e: std::io::Error) -> bool {
        error!("Error accepting connection: {e}");

        if e.kind() == std::io::ErrorKind::BrokenPipe {
            error!("Critical error accepting connection, shutting down");
            return true;
        }

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        false
    }

    /// Perform graceful shutdown.
    async fn perform_shutdown(tasks: &mut JoinSet<()>) {
        info!("Waiting for {len} active connections to complete...", len = tasks.len());
        let shutdown_timeout = tokio::time::Duration::from_secs(30);
        let _ = tokio::time::timeout(shutdown_timeout, async {
            while let Some(res) = tasks.join_next().await {
                if let Err(e) = res {
                    error!("Task failed during shutdown: {e}");
                }
            }
        })
        .await;

        info!("Server shutdown complete");
    }

    /// Start the server and listen for incoming connections.
    pub async fn start(&self) -> Result<(), Error> {
        self.display_server_info().await;

        let listener = self.setup_listener().await?;
        let semaphore = Arc::new(Semaphore::new(self.config.max_connections));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let mut tasks = JoinSet::new();

        Self::setup_ctrl_c_handler(shutdown_tx, &mut tasks);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Shutting down server...");
                    break;
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((socket, addr)) => {
                            Self::handle_new_connection(
                                socket,
                                addr,
                                semaphore.clone(),
                                self.router.clone(),
                                self.config.clone(),
                                &mut tasks,
                            ).await;
                        },
                        Err(e) => {
                            if Self::handle_connection_error(e).await {
                                break;
                            }
                        }
                    }
                }
            }
        }

        Self::perform_shutdown(&mut tasks).await;

        Ok(())
    }

    /// Handle a single connection: read one request, dispatch it and write
    /// the response.
    ///
    /// Malformed requests get a 400 and oversized bodies a 413; both are
    /// also returned as errors. Errors and panics inside handlers become a
    /// 500 (or the status the error maps to) and are only logged.
    pub async fn handle_connection(
        socket: &mut (impl AsyncRead + AsyncWrite + Unpin),
        router: Arc<RwLock<Router>>,
        config: &ServerConfig,
        remote_addr: Option<SocketAddr>,
    ) -> Result<(), Error> {
        let mut request = match Self::read_request(socket, config).await {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()),
            Err(e @ Error::ParseError(_)) => {
                let response = HttpResponse::new(StatusCode::BadRequest)
                    .with_content_type("text/plain")
                    .with_body_string(format!("Error parsing request: {e}"));
                socket.write_all(&response.to_bytes()).await?;
                return Err(e);
            }
            Err(e @ Error::PayloadTooLarge { .. }) => {
                socket.write_all(&HttpResponse::text(StatusCode::PayloadTooLarge).to_bytes()).await?;
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        request.remote_addr = remote_addr;
        debug!("{} {}", request.method, request.path);

        // Dispatch from a snapshot so the lock is not held across the handler
        let snapshot = router.read().await.clone();
        let outcome = tokio::spawn(async move { snapshot.dispatch(request).await }).await;

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => HttpResponse::error(e.status(), &e, e.status().reason_phrase()),
            Err(join_error) if join_error.is_panic() => HttpResponse::error(
                StatusCode::InternalServerError,
                &"handler panicked",
                StatusCode::InternalServerError.reason_phrase(),
            ),
            Err(join_error) => return Err(Error::InternalError(join_error.to_string())),
        };

        let response = response.with_default_header("Connection", "close");
        socket.write_all(&response.to_bytes()).await?;
        socket.flush().await?;
        Ok(())
    }

    /// Read one request: the head, then as much body as Content-Length
    /// announces.
    ///
    /// Returns `Ok(None)` if the peer closed the connection without sending
    /// anything. The head must fit in `read_buffer_size` bytes.
    async fn read_request(
        socket: &mut (impl AsyncRead + Unpin),
        config: &ServerConfig,
    ) -> Result<Option<HttpRequest>, Error> {
        let mut buf = Vec::with_capacity(config.read_buffer_size);
        let mut chunk = vec![0; config.read_buffer_size.max(1)];

        let head_end = loop {
            if let Some(end) = find_head_end(&buf) {
                break Some(end);
            }
            if buf.len() >= config.read_buffer_size {
                break None;
            }
            let n = socket.read(&mut chunk).await?;
            if n == 0 {
                break None;
            }
            buf.extend_from_slice(&chunk[..n]);
        };

        if buf.is_empty() {
            return Ok(None);
        }
        let Some(head_end) = head_end else {
            if buf.len() >= config.read_buffer_size {
                return Err(ParserError::HeadTooLarge { limit: config.read_buffer_size }.into());
            }
            // Connection closed mid-head: let the parser judge what arrived
            return Ok(Some(parse_request(&buf)?));
        };

        let mut request = parse_request(&buf[..head_end])?;
        let expected = content_length(&request.headers)?;
        let limit = config.max_body_size;
        match expected {
            Some(size) if size > limit => return Err(Error::PayloadTooLarge { size, limit }),
            None if buf.len() - head_end > limit => {
                return Err(Error::PayloadTooLarge { size: buf.len() - head_end, limit });
            }
            _ => {}
        }

        if let Some(size) = expected {
            while buf.len() - head_end < size {
                let n = socket.read(&mut chunk).await?;
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let end = buf.len().min(head_end + size);
            request.body = buf[head_end..end].to_vec();
        } else {
            request.body = buf[head_end..].to_vec();
        }

        Ok(Some(request))
    }
}
