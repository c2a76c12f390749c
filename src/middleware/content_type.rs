use std::sync::Arc;

use crate::middleware::Middleware;
use crate::parser::HttpRequest;
use crate::server::handler::{HandlerFn, HandlerFuture};
use crate::server::{HttpResponse, StatusCode};

/// Reject requests whose `Content-Type` is not `expected` with a 415.
///
/// Only the media type is compared, case-insensitively; parameters such as
/// `charset` are ignored.
pub fn content_type_filter(expected: &str) -> Middleware {
    let expected = media_type(expected).to_string();
    Arc::new(move |handler: HandlerFn| -> HandlerFn {
        let expected = expected.clone();
        Arc::new(move |req: HttpRequest| -> HandlerFuture {
            let accepted = req
                .get_header("Content-Type")
                .is_some_and(|value| media_type(value).eq_ignore_ascii_case(&expected));
            if !accepted {
                let found = req.get_header("Content-Type").cloned().unwrap_or_default();
                let detail = format!("unsupported content type {found:?}, expected {expected:?}");
                return Box::pin(async move {
                    Ok(HttpResponse::error(StatusCode::UnsupportedMediaType, &detail, "unsupported content type"))
                });
            }
            handler(req)
        })
    })
}

fn media_type(value: &str) -> &str {
    value.split(';').next().unwrap_or_default().trim()
}
