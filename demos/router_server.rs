//! A server showing routing, middleware, static files and sessions.
//!
//! Run with `RUST_LOG=info cargo run --example router_server` and try:
//!
//! ```text
//! curl -i http://127.0.0.1:8081/users/42
//! curl -i -X DELETE http://127.0.0.1:8081/users
//! curl -i http://127.0.0.1:8081/files/docs/readme.md
//! curl -i -c jar -b jar http://127.0.0.1:8081/visits
//! ```

use std::sync::Arc;
use log::info;
use serde::Deserialize;
use serde_json::json;

use cyclops::middleware::{content_type_filter, Chain, Cors};
use cyclops::{
    handler_fn, HttpResponse, HttpServer, MemoryStore, Method, Router, RouterConfig, ServerConfig, ServerError,
    Session, SessionData, StatusCode,
};

#[derive(Deserialize)]
struct NewUser {
    name: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = ServerConfig {
        addr: "127.0.0.1:8081".parse()?,
        max_connections: 100,
        ..ServerConfig::default()
    };

    let mut router = Router::new(RouterConfig { allow_trace: true, ..RouterConfig::default() });
    let chain = Chain::new().with(Cors::default().middleware());

    router.register_handler(Method::GET, "/users", chain.then(handler_fn(|_req| async {
        HttpResponse::success(StatusCode::Ok, &json!([{ "id": 1, "name": "ada" }]))
    })));

    let json_only = chain.clone().with(content_type_filter("application/json"));
    router.register_handler(Method::POST, "/users", json_only.then(handler_fn(|req| async move {
        let user: NewUser = req.json().map_err(ServerError::ParseError)?;
        HttpResponse::success(StatusCode::Created, &json!({ "name": user.name }))
    })));

    router.register_handler(Method::GET, "/users/:id", chain.then(handler_fn(|req| async move {
        match req.param("id").parse::<u32>() {
            Ok(id) => HttpResponse::success(StatusCode::Ok, &json!({ "id": id })),
            Err(e) => Ok(HttpResponse::error(StatusCode::BadRequest, &e, "id must be a number")),
        }
    })));

    router.get("/files/*path", |req| async move {
        Ok(HttpResponse::new(StatusCode::Ok)
            .with_content_type("text/plain")
            .with_body_string(format!("requested {}", req.param("path"))))
    });

    router.get("/old-home", |_req| async {
        Ok(HttpResponse::redirect(StatusCode::MovedPermanently, "/"))
    });

    let session = Session::new(Arc::new(MemoryStore::new()));
    router.get("/visits", move |req| {
        let session = session.clone();
        async move {
            let visits = match session.get(&req).await? {
                Some(data) => data.get("visits").and_then(|v| v.as_u64()).unwrap_or(0) + 1,
                None => 1,
            };
            let mut data = SessionData::new();
            data.insert("visits".to_string(), json!(visits));
            let response = HttpResponse::success(StatusCode::Ok, &json!({ "visits": visits }))?;
            session.update(&req, response, data).await
        }
    });

    router.register_static("public", "/static");

    info!("Starting server on http://{}", config.addr);
    HttpServer::with_router(config, router).start().await?;
    Ok(())
}
