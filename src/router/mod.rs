//! URL routing.
//!
//! Routes are patterns made of literal text, `:name` segments that capture a
//! single path segment, and a trailing `*name` segment that captures the rest
//! of the path. They are stored in a compressed prefix tree. Lookup prefers a
//! literal match over a parameter and a parameter over a catch-all, and falls
//! back to the alternatives when a more specific branch leads nowhere.
//!
//! ```
//! use cyclops::{HttpResponse, Router, StatusCode};
//!
//! let mut router = Router::default();
//! router.get("/users/:id", |req| async move {
//!     Ok(HttpResponse::new(StatusCode::Ok).with_body_string(format!("user {}", req.param("id"))))
//! });
//! ```

mod error;
mod handlers;
mod node;
mod params;
mod static_files;
mod tree;

use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use log::debug;

use crate::parser::{HttpRequest, Method};
use crate::server::handler::{handler_fn, HandlerFn};
use crate::server::{Error, HttpResponse};
use tree::RouteTree;

pub use error::RouteError;
pub use handlers::{method_not_allowed, not_found, trace_echo};
pub use params::Params;
pub use static_files::StaticFiles;
pub use tree::Resolution;

/// Router configuration.
#[derive(Clone)]
pub struct RouterConfig {
    /// Drop trailing slashes from patterns and request paths alike.
    pub strip_trailing_slash: bool,
    /// Echo TRACE requests on known paths instead of dispatching them.
    pub allow_trace: bool,
    /// Handler for paths no route matches; a plain 404 when unset.
    pub not_found_handler: Option<HandlerFn>,
    /// Handler for known paths without a handler for the method; a plain 405
    /// when unset. The router sets `Allow` on whatever it returns.
    pub method_not_allowed_handler: Option<HandlerFn>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            strip_trailing_slash: true,
            allow_trace: false,
            not_found_handler: None,
            method_not_allowed_handler: None,
        }
    }
}

/// The request router.
///
/// Cloning is cheap: clones share the route table until one of them
/// registers a route, at which point that clone gets its own copy. A server
/// can therefore keep answering from a snapshot while a new table is built.
#[derive(Clone, Default)]
pub struct Router {
    config: RouterConfig,
    tree: Arc<RouteTree>,
    statics: Arc<Vec<StaticFiles>>,
}

impl Router {
    /// Create a router with the given configuration.
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            tree: Arc::default(),
            statics: Arc::default(),
        }
    }

    /// The router configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Register a boxed handler, reporting invalid patterns as errors.
    pub fn try_register(&mut self, method: Method, pattern: &str, handler: HandlerFn) -> Result<(), RouteError> {
        let pattern = normalize(pattern, self.config.strip_trailing_slash);
        Arc::make_mut(&mut self.tree).insert(method, pattern, handler)?;
        debug!("Registered route {method} {pattern}");
        Ok(())
    }

    /// Register a boxed handler.
    ///
    /// # Panics
    ///
    /// Panics if the pattern is invalid. Routes are wired at startup, and a
    /// malformed one must stop the program before it serves traffic.
    pub fn register_handler(&mut self, method: Method, pattern: &str, handler: HandlerFn) {
        if let Err(e) = self.try_register(method, pattern, handler) {
            panic!("Cannot register {method} {pattern:?}: {e}");
        }
    }

    /// Register a handler for a method and pattern.
    ///
    /// Registering the same method and pattern again replaces the previous
    /// handler. A GET handler also answers HEAD requests unless a HEAD
    /// handler is registered for the same pattern.
    ///
    /// # Panics
    ///
    /// Panics if the pattern is invalid.
    pub fn register<F, Fut>(&mut self, method: Method, pattern: &str, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.register_handler(method, pattern, handler_fn(handler));
    }

    /// Register a handler for a method given by name.
    ///
    /// # Panics
    ///
    /// Panics if the method is not one of the nine standard verbs or the
    /// pattern is invalid.
    pub fn add<F, Fut>(&mut self, method: &str, pattern: &str, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        match Method::from_str(method) {
            Ok(method) => self.register(method, pattern, handler),
            Err(_) => panic!("{}", RouteError::InvalidMethod(method.to_string())),
        }
    }

    /// Register a GET handler (which also answers HEAD).
    pub fn get<F, Fut>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.register(Method::GET, pattern, handler);
    }

    /// Register a POST handler.
    pub fn post<F, Fut>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.register(Method::POST, pattern, handler);
    }

    /// Register a PUT handler.
    pub fn put<F, Fut>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.register(Method::PUT, pattern, handler);
    }

    /// Register a PATCH handler.
    pub fn patch<F, Fut>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.register(Method::PATCH, pattern, handler);
    }

    /// Register a DELETE handler.
    pub fn delete<F, Fut>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.register(Method::DELETE, pattern, handler);
    }

    /// Register a HEAD handler, taking precedence over the one derived from GET.
    pub fn head<F, Fut>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.register(Method::HEAD, pattern, handler);
    }

    /// Register a TRACE handler.
    ///
    /// With [`RouterConfig::allow_trace`] set, TRACE requests are echoed and
    /// this handler is not called.
    pub fn trace<F, Fut>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.register(Method::TRACE, pattern, handler);
    }

    /// Register an OPTIONS handler.
    pub fn options<F, Fut>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.register(Method::OPTIONS, pattern, handler);
    }

    /// Register a CONNECT handler.
    pub fn connect<F, Fut>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.register(Method::CONNECT, pattern, handler);
    }

    /// Serve the files in `directory` under `url_prefix`.
    ///
    /// Static mounts are consulted before the route table.
    pub fn register_static(&mut self, directory: impl Into<PathBuf>, url_prefix: &str) {
        let files = StaticFiles::new(directory, url_prefix);
        debug!("Serving static files under {}", files.prefix());
        Arc::make_mut(&mut self.statics).push(files);
    }

    /// Resolve a path for a method without running anything.
    ///
    /// The path is normalised the same way patterns are at registration.
    pub fn resolve(&self, method: Method, path: &str) -> Resolution {
        self.tree.resolve(method, normalize(path, self.config.strip_trailing_slash))
    }

    /// Every explicitly registered (method, pattern) pair.
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.tree.routes()
    }

    /// Static mounts, in registration order.
    pub fn static_mounts(&self) -> &[StaticFiles] {
        &self.statics
    }

    /// Route a request and produce its response.
    ///
    /// Missing routes and methods become 404 and 405 responses. Errors
    /// returned by handlers are passed through for the caller to map.
    pub async fn dispatch(&self, mut request: HttpRequest) -> Result<HttpResponse, Error> {
        let path = request.route_path();

        if let Some(files) = self.statics.iter().find(|files| files.matches(&path)) {
            return Ok(files.serve(&request, &path).await);
        }

        let path = normalize(&path, self.config.strip_trailing_slash);
        let resolution = self.tree.resolve(request.method, path);

        let echo = self.config.allow_trace && request.method == Method::TRACE;
        if echo && !matches!(resolution, Resolution::NotFound) {
            return Ok(trace_echo(&request));
        }

        match resolution {
            Resolution::Found { handler, params } => {
                request.params = params;
                handler(request).await
            }
            Resolution::MethodNotAllowed { allowed } => {
                let allowed = self.allow_header(allowed);
                let response = match &self.config.method_not_allowed_handler {
                    Some(handler) => handler(request).await?,
                    None => method_not_allowed(&allowed),
                };
                Ok(response.with_header("Allow", allowed))
            }
            Resolution::NotFound => match &self.config.not_found_handler {
                Some(handler) => handler(request).await,
                None => Ok(not_found()),
            },
        }
    }

    /// The `Allow` value for a path, including TRACE when it is echoed.
    fn allow_header(&self, allowed: String) -> String {
        if self.config.allow_trace && !allowed.split(", ").any(|m| m == "TRACE") {
            format!("{allowed}, TRACE")
        } else {
            allowed
        }
    }
}

/// Get a route parameter from a request.
///
/// Returns an empty string if the matched route has no parameter with that
/// name.
pub fn param<'r>(request: &'r HttpRequest, name: &str) -> &'r str {
    request.param(name)
}

/// Normalise a pattern or request path.
///
/// Drops one trailing slash, never the root itself. Applied identically at
/// registration and at lookup; any other slashes are kept as they are.
fn normalize(path: &str, strip_trailing_slash: bool) -> &str {
    if !strip_trailing_slash || path.len() <= 1 {
        return path;
    }
    path.strip_suffix('/').unwrap_or(path)
}
