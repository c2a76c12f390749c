use std::any::Any;
use std::sync::Arc;

use crate::parser::HttpRequest;
use crate::server::handler::{HandlerFn, HandlerFuture};
use crate::server::{Error, HttpResponse, StatusCode};

/// Turn a panic inside `handler` into a 500 response.
///
/// The handler runs on its own task; the panic message is logged and sent
/// back as `{"error": "<message>"}`.
pub fn panic_handler(handler: HandlerFn) -> HandlerFn {
    Arc::new(move |req: HttpRequest| -> HandlerFuture {
        let handler = handler.clone();
        Box::pin(async move {
            match tokio::spawn(handler(req)).await {
                Ok(result) => result,
                Err(e) if e.is_panic() => {
                    let message = panic_message(e.into_panic());
                    Ok(HttpResponse::error(StatusCode::InternalServerError, &message, &message))
                }
                Err(e) => Err(Error::InternalError(e.to_string())),
            }
        })
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown error".to_string()
    }
}
