//! The HTTP server: connection handling, responses and handler types.

mod response;
mod config;
mod error;
pub mod handler;
mod http_server;
mod tests;

pub use response::{HttpResponse, StatusCode};
pub use config::ServerConfig;
pub use error::Error;
pub use handler::{handler_fn, HandlerFn, HandlerFuture};
pub use http_server::HttpServer;
