//! Built-in responses the router produces on its own.

use std::sync::Arc;

use crate::parser::HttpRequest;
use crate::server::handler::{HandlerFn, HandlerFuture};
use crate::server::{HttpResponse, StatusCode};

/// Plain `404 Not Found`.
pub fn not_found() -> HttpResponse {
    HttpResponse::text(StatusCode::NotFound)
}

/// Plain `405 Method Not Allowed` carrying the `Allow` header.
pub fn method_not_allowed(allowed: &str) -> HttpResponse {
    HttpResponse::text(StatusCode::MethodNotAllowed).with_header("Allow", allowed)
}

/// Echo the request body back as `message/http`.
pub fn trace_echo(request: &HttpRequest) -> HttpResponse {
    HttpResponse::new(StatusCode::Ok)
        .with_content_type("message/http")
        .with_body_bytes(request.body.clone())
}

/// Wrap a GET handler so it answers HEAD requests.
///
/// The GET handler runs as usual; its status and headers are kept and its
/// body is dropped before the response leaves the router.
pub(crate) fn head_handler(get: HandlerFn) -> HandlerFn {
    Arc::new(move |req: HttpRequest| -> HandlerFuture {
        let get = get.clone();
        Box::pin(async move {
            let mut response = get(req).await?;
            response.body.clear();
            Ok(response)
        })
    })
}
