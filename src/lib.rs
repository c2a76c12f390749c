//! A small HTTP framework built around a prefix-tree router.
//!
//! Routes are patterns with literal segments, `:name` parameters and a
//! trailing `*name` catch-all. Lookup prefers literal segments over
//! parameters and parameters over the catch-all, backtracking when a more
//! specific branch leads nowhere. Unknown paths get a 404, known paths
//! without a handler for the method get a 405 with an `Allow` header, and
//! every GET route answers HEAD as well.
//!
//! # Features
//!
//! - Prefix-tree routing with parameters, catch-alls and backtracking
//! - Static files served from a directory under a URL prefix
//! - Middleware chains: panic recovery, request logging, security headers,
//!   CORS and content type filtering
//! - Cookies and sessions with a pluggable store
//! - An async HTTP/1.1 server on tokio with connection limits and graceful
//!   shutdown
//!
//! # Examples
//!
//! ## Routing
//!
//! ```
//! use cyclops::{HttpResponse, Method, Router, StatusCode};
//!
//! let mut router = Router::default();
//! router.get("/users/:id", |req| async move {
//!     let id = req.param("id").to_string();
//!     HttpResponse::success(StatusCode::Ok, &serde_json::json!({ "id": id }))
//! });
//! router.get("/files/*path", |req| async move {
//!     Ok(HttpResponse::new(StatusCode::Ok).with_body_string(req.param("path").to_string()))
//! });
//!
//! assert_eq!(router.routes().len(), 2);
//! assert!(matches!(router.resolve(Method::HEAD, "/users/7"), cyclops::Resolution::Found { .. }));
//! ```
//!
//! ## Parsing a request
//!
//! ```
//! use cyclops::{parse_request, Method, ParserError};
//!
//! let request = parse_request(b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
//! assert_eq!(request.method, Method::GET);
//!
//! let invalid = parse_request(b"BREW /pot HTTP/1.1\r\nHost: example.com\r\n\r\n");
//! assert!(matches!(invalid, Err(ParserError::InvalidMethod(_))));
//! ```
//!
//! ## Serving
//!
//! ```no_run
//! use cyclops::{HttpResponse, HttpServer, Router, ServerConfig, StatusCode};
//!
//! # async fn run() -> Result<(), cyclops::ServerError> {
//! let mut router = Router::default();
//! router.get("/", |_req| async { Ok(HttpResponse::text(StatusCode::Ok)) });
//!
//! HttpServer::with_router(ServerConfig::default(), router).start().await
//! # }
//! ```

pub mod cookie;
pub mod middleware;
pub mod parser;
pub mod router;
pub mod server;
pub mod session;

pub use cookie::{Cookie, SameSite};
pub use parser::{Error as ParserError, HttpRequest, HttpVersion, Method, parse_request};
pub use router::{param, Params, Resolution, RouteError, Router, RouterConfig, StaticFiles};
pub use server::{handler_fn, Error as ServerError, HandlerFn, HandlerFuture, HttpResponse, HttpServer, ServerConfig, StatusCode};
pub use session::{MemoryStore, Session, SessionData, Store};
