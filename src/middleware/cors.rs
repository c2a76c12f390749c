use std::sync::Arc;

use crate::middleware::Middleware;
use crate::parser::{HttpRequest, Method};
use crate::server::handler::{HandlerFn, HandlerFuture};
use crate::server::{HttpResponse, StatusCode};

/// Cross-origin resource sharing settings.
///
/// The middleware answers preflight requests (OPTIONS carrying
/// `Access-Control-Request-Method`) itself, so it has to wrap a handler
/// registered for OPTIONS on the same pattern.
#[derive(Debug, Clone)]
pub struct Cors {
    /// Value of `Access-Control-Allow-Origin`; `*` allows any origin.
    pub allowed_origin: String,
    /// Send `Access-Control-Allow-Credentials: true`.
    pub allow_credentials: bool,
    pub allowed_headers: Vec<String>,
    pub allowed_methods: Vec<Method>,
    pub exposed_headers: Vec<String>,
    /// How long a preflight answer may be cached, in seconds.
    pub max_age: Option<u32>,
}

impl Default for Cors {
    fn default() -> Self {
        Self {
            allowed_origin: "*".to_string(),
            allow_credentials: false,
            allowed_headers: Vec::new(),
            allowed_methods: vec![Method::HEAD, Method::GET, Method::POST],
            exposed_headers: Vec::new(),
            max_age: None,
        }
    }
}

impl Cors {
    /// The middleware applying these settings.
    pub fn middleware(&self) -> Middleware {
        let cors = Arc::new(self.clone());
        Arc::new(move |handler: HandlerFn| -> HandlerFn {
            let cors = cors.clone();
            Arc::new(move |req: HttpRequest| -> HandlerFuture {
                let cors = cors.clone();
                let handler = handler.clone();
                Box::pin(async move {
                    if is_preflight(&req) {
                        return Ok(cors.preflight());
                    }
                    let response = handler(req).await?;
                    Ok(cors.decorate(response))
                })
            })
        })
    }

    fn decorate(&self, mut response: HttpResponse) -> HttpResponse {
        response = response.with_header("Access-Control-Allow-Origin", self.allowed_origin.as_str());
        if self.allowed_origin != "*" {
            response = response.with_header("Vary", "Origin");
        }
        if self.allow_credentials {
            response = response.with_header("Access-Control-Allow-Credentials", "true");
        }
        if !self.exposed_headers.is_empty() {
            response = response.with_header("Access-Control-Expose-Headers", self.exposed_headers.join(", "));
        }
        response
    }

    fn preflight(&self) -> HttpResponse {
        let methods = self
            .allowed_methods
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let mut response = HttpResponse::new(StatusCode::NoContent)
            .with_header("Access-Control-Allow-Methods", methods)
            .with_header("Content-Length", "0");
        if !self.allowed_headers.is_empty() {
            response = response.with_header("Access-Control-Allow-Headers", self.allowed_headers.join(", "));
        }
        if let Some(max_age) = self.max_age {
            response = response.with_header("Access-Control-Max-Age", max_age.to_string());
        }
        self.decorate(response)
    }
}

fn is_preflight(req: &HttpRequest) -> bool {
    req.method == Method::OPTIONS && req.has_header("Access-Control-Request-Method")
}
