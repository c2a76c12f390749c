use std::sync::Arc;

use crate::parser::HttpRequest;
use crate::server::handler::{HandlerFn, HandlerFuture};

const SECURITY_HEADERS: [(&str, &str); 3] = [
    ("X-Content-Type-Options", "nosniff"),
    ("X-Frame-Options", "deny"),
    ("X-XSS-Protection", "1; mode=block"),
];

/// Add the security headers to every response, and `Content-Type:
/// application/json` to responses that do not set a content type.
pub fn set_headers(handler: HandlerFn) -> HandlerFn {
    Arc::new(move |req: HttpRequest| -> HandlerFuture {
        let handler = handler.clone();
        Box::pin(async move {
            let mut response = handler(req).await?;
            for (name, value) in SECURITY_HEADERS {
                response = response.with_header(name, value);
            }
            Ok(response.with_default_header("Content-Type", "application/json"))
        })
    })
}
