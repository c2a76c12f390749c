//! Parser errors.

use thiserror::Error;

/// Why a request could not be turned into an [`HttpRequest`](super::HttpRequest).
///
/// Every variant is a client error; the server answers all of them with a
/// 400 Bad Request.
#[derive(Debug, Error)]
pub enum Error {
    /// Nothing but whitespace arrived.
    #[error("Empty request")]
    EmptyRequest,

    /// The request line does not have the `METHOD TARGET VERSION` shape, or
    /// the head is not UTF-8.
    #[error("Malformed request line: {0}")]
    MalformedRequestLine(String),

    /// The verb is not one of the nine standard methods.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// The target is neither an absolute path nor `*`.
    #[error("Invalid HTTP path")]
    InvalidPath,

    #[error("Invalid HTTP version: {0}")]
    InvalidVersion(String),

    /// A header line without a `:` separator.
    #[error("Invalid header format")]
    InvalidHeaderFormat,

    /// A header the request cannot do without, such as `Host` on HTTP/1.1.
    #[error("Required header is missing: {0}")]
    MissingHeader(String),

    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    /// The header section did not end within the read buffer.
    #[error("Request head exceeds {limit} bytes")]
    HeadTooLarge { limit: usize },

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}
