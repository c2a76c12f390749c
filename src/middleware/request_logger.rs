use std::sync::Arc;
use chrono::Utc;
use log::info;
use serde::Serialize;

use crate::parser::HttpRequest;
use crate::server::handler::{HandlerFn, HandlerFuture};

/// One access log line.
#[derive(Debug, Serialize)]
pub(crate) struct LogObject {
    pub timestamp: String,
    /// Address of the peer; a proxy when there is one.
    pub remote_address: String,
    /// Address of the original client as reported by a proxy.
    pub true_ip: String,
    pub method: String,
    pub path: String,
    pub host: String,
    pub protocol: String,
    pub user_agent: String,
    pub status: u16,
}

impl LogObject {
    pub(crate) fn new(req: &HttpRequest, status: u16) -> Self {
        let header = |name: &str| req.get_header(name).cloned().unwrap_or_default();
        let remote_address = req.remote_addr.map(|a| a.to_string()).unwrap_or_default();
        let true_ip = req
            .get_header("X-Forwarded-For")
            .and_then(|value| value.split(',').next())
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty())
            .or_else(|| req.get_header("X-Real-IP").cloned())
            .or_else(|| req.remote_addr.map(|a| a.ip().to_string()))
            .unwrap_or_default();

        Self {
            timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            remote_address,
            true_ip,
            method: req.method.to_string(),
            path: req.route_path(),
            host: header("Host"),
            protocol: req.version.to_string(),
            user_agent: header("User-Agent"),
            status,
        }
    }
}

/// Log every request as a JSON line once its response is ready.
pub fn request_logger(handler: HandlerFn) -> HandlerFn {
    Arc::new(move |req: HttpRequest| -> HandlerFuture {
        let handler = handler.clone();
        Box::pin(async move {
            let mut entry = LogObject::new(&req, 0);
            let result = handler(req).await;
            entry.status = match &result {
                Ok(response) => response.status.as_u16(),
                Err(e) => e.status().as_u16(),
            };
            if let Ok(line) = serde_json::to_string(&entry) {
                info!("{line}");
            }
            result
        })
    })
}
