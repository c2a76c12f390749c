//! HTTP response types and utilities.

use std::collections::HashMap;
use std::fmt;
use chrono::{SecondsFormat, Utc};
use log::error;
use serde::Serialize;

use crate::cookie::Cookie;
use crate::server::error::Error;

/// HTTP status codes with their standard reason phrases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok = 200,
    Created = 201,
    Accepted = 202,
    NoContent = 204,
    MovedPermanently = 301,
    Found = 302,
    SeeOther = 303,
    NotModified = 304,
    TemporaryRedirect = 307,
    PermanentRedirect = 308,
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    PayloadTooLarge = 413,
    UnsupportedMediaType = 415,
    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
}

impl StatusCode {
    /// The numeric status code.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Get the reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::Accepted => "Accepted",
            StatusCode::NoContent => "No Content",
            StatusCode::MovedPermanently => "Moved Permanently",
            StatusCode::Found => "Found",
            StatusCode::SeeOther => "See Other",
            StatusCode::NotModified => "Not Modified",
            StatusCode::TemporaryRedirect => "Temporary Redirect",
            StatusCode::PermanentRedirect => "Permanent Redirect",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::UnsupportedMediaType => "Unsupported Media Type",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::BadGateway => "Bad Gateway",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// Check whether this is a 3xx status.
    pub fn is_redirection(self) -> bool {
        (300..400).contains(&self.as_u16())
    }
}

/// Body of the JSON error responses.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// Log line written for every error response.
#[derive(Debug, Serialize)]
struct ErrorLog<'a> {
    timestamp: String,
    error: &'a str,
    status_code: u16,
}

/// Represents an HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The HTTP status code
    pub status: StatusCode,
    /// The HTTP headers
    pub headers: HashMap<String, String>,
    /// Values of the `Set-Cookie` headers, one per cookie
    pub cookies: Vec<String>,
    /// The response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a new HTTP response with the given status code.
    pub fn new(status: StatusCode) -> Self {
        let mut headers = HashMap::new();
        headers.insert("Server".to_string(), "cyclops-rs".to_string());

        Self {
            status,
            headers,
            cookies: Vec::new(),
            body: Vec::new(),
        }
    }

    /// A plain-text response whose body is the reason phrase.
    pub fn text(status: StatusCode) -> Self {
        Self::new(status)
            .with_content_type("text/plain; charset=utf-8")
            .with_body_string(status.reason_phrase())
    }

    /// A JSON response with the given status.
    pub fn success<T: Serialize>(status: StatusCode, body: &T) -> Result<Self, Error> {
        Self::new(status).with_json(body)
    }

    /// A JSON error response of the form `{"error": message}`.
    ///
    /// `err` is logged together with the status; only `message` is sent to
    /// the client.
    pub fn error(status: StatusCode, err: &dyn fmt::Display, message: &str) -> Self {
        let detail = err.to_string();
        let log = ErrorLog {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            error: &detail,
            status_code: status.as_u16(),
        };
        match serde_json::to_string(&log) {
            Ok(line) => error!("{line}"),
            Err(_) => error!("{status:?}: {detail}"),
        }

        let body = serde_json::to_vec(&ErrorBody { error: message }).unwrap_or_default();
        Self::new(status)
            .with_content_type("application/json")
            .with_body_bytes(body)
    }

    /// A redirect to `location`.
    ///
    /// Statuses outside the 3xx range fall back to `302 Found`.
    pub fn redirect(status: StatusCode, location: impl Into<String>) -> Self {
        let status = if status.is_redirection() { status } else { StatusCode::Found };
        Self::new(status)
            .with_header("Location", location)
            .with_header("Content-Length", "0")
    }

    /// Set the response body with a string.
    pub fn with_body_string(mut self, body: impl Into<String>) -> Self {
        let body_string = body.into();
        self.body = body_string.into_bytes();
        let content_length = self.body.len().to_string();
        self.with_header("Content-Length", content_length)
    }

    /// Set the response body with bytes.
    pub fn with_body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        let content_length = self.body.len().to_string();
        self.with_header("Content-Length", content_length)
    }

    /// Add or replace a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add a header unless one with the same name (in any case) is present.
    pub fn with_default_header(mut self, name: &str, value: impl Into<String>) -> Self {
        if !self.has_header(name) {
            self.headers.insert(name.to_string(), value.into());
        }
        self
    }

    /// Get a header value, comparing names case-insensitively.
    pub fn get_header(&self, name: &str) -> Option<&String> {
        self.headers
            .iter()
            .find_map(|(k, v)| k.eq_ignore_ascii_case(name).then_some(v))
    }

    /// Check if a header exists.
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// Set the content type.
    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        self.with_header("Content-Type", content_type)
    }

    /// Attach a cookie.
    pub fn with_cookie(mut self, cookie: &Cookie) -> Self {
        self.cookies.push(cookie.to_header_value());
        self
    }

    /// Set the response body with a JSON value.
    ///
    /// This method serializes the provided value to JSON and sets it as the response body.
    pub fn with_json<T: Serialize>(self, value: &T) -> Result<Self, Error> {
        let json = serde_json::to_vec(value).map_err(Error::JsonError)?;
        Ok(self
            .with_header("Content-Type", "application/json")
            .with_body_bytes(json))
    }

    /// Convert the response to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();

        // Add the status line
        let status_line = format!("HTTP/1.1 {} {}\r\n", self.status.as_u16(), self.status.reason_phrase());
        bytes.extend_from_slice(status_line.as_bytes());

        // Add the headers
        for (name, value) in &self.headers {
            let header_line = format!("{name}: {value}\r\n");
            bytes.extend_from_slice(header_line.as_bytes());
        }
        for cookie in &self.cookies {
            let header_line = format!("Set-Cookie: {cookie}\r\n");
            bytes.extend_from_slice(header_line.as_bytes());
        }

        // Add the empty line that separates headers from body
        bytes.extend_from_slice(b"\r\n");

        // Add the body
        bytes.extend_from_slice(&self.body);

        bytes
    }
}
