//! HTTP parser module.
//!
//! Turns the raw bytes read from a connection into an [`HttpRequest`]: the
//! request line, the header section and whatever body follows it.

mod request;
mod method;
mod version;
mod error;

// Re-export public items
pub use request::HttpRequest;
pub use method::Method;
pub use version::HttpVersion;
pub use error::Error;

// Re-export the parsing functions
pub use request::{content_length, find_head_end, parse_request};
