//! Middleware: functions that wrap a handler in another handler.
//!
//! A [`Chain`] applies a list of middlewares to a handler and then adds the
//! defaults every handler gets: panic recovery, request logging and the
//! security headers.
//!
//! ```
//! use cyclops::middleware::{content_type_filter, Chain, Cors};
//! use cyclops::{HttpResponse, Method, Router, StatusCode, handler_fn};
//!
//! let chain = Chain::new()
//!     .with(content_type_filter("application/json"))
//!     .with(Cors::default().middleware());
//!
//! let mut router = Router::default();
//! router.register_handler(Method::POST, "/items", chain.then(handler_fn(|_req| async {
//!     Ok(HttpResponse::new(StatusCode::Created))
//! })));
//! ```

mod content_type;
mod cors;
mod headers;
mod panic_handler;
mod request_logger;

use std::sync::Arc;

use crate::server::handler::HandlerFn;

pub use content_type::content_type_filter;
pub use cors::Cors;
pub use headers::set_headers;
pub use panic_handler::panic_handler;
pub use request_logger::request_logger;

/// A function that wraps a handler.
pub type Middleware = Arc<dyn Fn(HandlerFn) -> HandlerFn + Send + Sync>;

/// An ordered list of middlewares.
#[derive(Clone, Default)]
pub struct Chain {
    middlewares: Vec<Middleware>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware. Middlewares added later wrap the ones added
    /// earlier, so they see the request first.
    pub fn with(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Wrap `handler` in every middleware of the chain, then in the
    /// defaults: `set_headers(request_logger(panic_handler(..)))`.
    pub fn then(&self, handler: HandlerFn) -> HandlerFn {
        let handler = self
            .middlewares
            .iter()
            .fold(handler, |handler, middleware| middleware(handler));
        set_headers(request_logger(panic_handler(handler)))
    }
}

impl FromIterator<Middleware> for Chain {
    fn from_iter<I: IntoIterator<Item = Middleware>>(iter: I) -> Self {
        Self {
            middlewares: iter.into_iter().collect(),
        }
    }
}
