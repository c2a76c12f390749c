//! HTTP request parsing and representation.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;

use crate::cookie::parse_cookies;
use crate::parser::error::Error;
use crate::parser::method::Method;
use crate::parser::version::HttpVersion;
use crate::router::Params;

/// Represents an HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request target, including any query string
    pub path: String,
    /// The HTTP version
    pub version: HttpVersion,
    /// The HTTP headers
    pub headers: HashMap<String, String>,
    /// The request body
    pub body: Vec<u8>,
    /// Query parameters parsed from the path
    pub query_params: HashMap<String, String>,
    /// Route parameters captured by the router
    pub params: Params,
    /// Address of the peer, when known
    pub remote_addr: Option<SocketAddr>,
}

impl HttpRequest {
    /// Create a new HTTP request.
    ///
    /// # Arguments
    ///
    /// * `method` - The HTTP method
    /// * `path` - The request target
    /// * `version` - The HTTP version
    /// * `headers` - The HTTP headers
    ///
    /// # Returns
    ///
    /// A new HTTP request with an empty body and no route parameters
    pub fn new(method: Method, path: String, version: HttpVersion, headers: HashMap<String, String>) -> Self {
        // Parse query parameters from the path
        let query_params: HashMap<String, String> = path
            .split_once('?')
            .map(|(_, query)| query
                .split('&')
                .filter(|s| !s.is_empty())
                .map(|pair| {
                    if let Some((k, v)) = pair.split_once('=') {
                        (k.to_string(), v.to_string())
                    } else {
                        (pair.to_string(), String::new())
                    }
                })
                .collect())
            .unwrap_or_default();

        Self {
            method,
            path,
            version,
            headers,
            body: Vec::new(),
            query_params,
            params: Params::new(),
            remote_addr: None,
        }
    }

    /// Create a new HTTP request with a body.
    ///
    /// # Arguments
    ///
    /// * `method` - The HTTP method
    /// * `path` - The request target
    /// * `version` - The HTTP version
    /// * `headers` - The HTTP headers
    /// * `body` - The request body
    ///
    /// # Returns
    ///
    /// A new HTTP request carrying `body`, with no route parameters
    pub fn with_body(method: Method, path: String, version: HttpVersion, headers: HashMap<String, String>, body: Vec<u8>) -> Self {
        let mut request = Self::new(method, path, version, headers);
        request.body = body;
        request
    }

    /// Get a header value.
    ///
    /// # Arguments
    ///
    /// * `name` - The header name, compared case-insensitively
    ///
    /// # Returns
    ///
    /// The header value, if the request carries that header
    pub fn get_header(&self, name: &str) -> Option<&String> {
        self.headers.iter().find_map(|(k, v)| {
            if k.eq_ignore_ascii_case(name) {
                Some(v)
            } else {
                None
            }
        })
    }

    /// Check if a header exists.
    ///
    /// # Arguments
    ///
    /// * `name` - The header name
    ///
    /// # Returns
    ///
    /// true if the header exists, false otherwise
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// Parse the request body as JSON.
    ///
    /// # Returns
    ///
    /// The parsed JSON value, or an error if the request is not declared as
    /// JSON or the body is not valid JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if !self.is_json() {
            return Err(Error::MissingHeader("Content-Type: application/json".to_string()));
        }

        let json = serde_json::from_slice(&self.body)?;
        Ok(json)
    }

    /// Check if the request has a JSON body.
    ///
    /// # Returns
    ///
    /// true if the Content-Type is `application/json`, false otherwise
    pub fn is_json(&self) -> bool {
        if let Some(content_type) = self.get_header("Content-Type") {
            content_type.starts_with("application/json")
        } else {
            false
        }
    }

    /// Get a query parameter value.
    ///
    /// # Arguments
    ///
    /// * `name` - The query parameter name
    ///
    /// # Returns
    ///
    /// The raw (still percent-encoded) value, if the parameter exists
    pub fn get_query_param(&self, name: &str) -> Option<&String> {
        self.query_params.get(name)
    }

    /// Check if a query parameter exists.
    ///
    /// # Arguments
    ///
    /// * `name` - The query parameter name
    ///
    /// # Returns
    ///
    /// true if the parameter exists, false otherwise
    pub fn has_query_param(&self, name: &str) -> bool {
        self.query_params.contains_key(name)
    }

    /// The path the router matches against.
    ///
    /// This is the request target without its query string, with percent
    /// escapes decoded. Invalid UTF-8 sequences are replaced rather than
    /// rejected, so routing never fails on the encoding alone.
    ///
    /// # Returns
    ///
    /// The decoded path, e.g. `/files/my doc.txt` for `/files/my%20doc.txt?dl=1`
    pub fn route_path(&self) -> String {
        let raw = match self.path.split_once('?') {
            Some((path, _)) => path,
            None => self.path.as_str(),
        };
        percent_decode_str(raw).decode_utf8_lossy().into_owned()
    }

    /// Get a route parameter captured by the router.
    ///
    /// # Arguments
    ///
    /// * `name` - The name used in the route pattern, without the `:` or `*`
    ///
    /// # Returns
    ///
    /// The captured value, or an empty string if the matched route has no
    /// parameter with that name
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).unwrap_or_default()
    }

    /// All route parameters, in the order they appear in the path.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Get the value of a cookie sent with the request.
    ///
    /// # Arguments
    ///
    /// * `name` - The cookie name
    ///
    /// # Returns
    ///
    /// The cookie value, if the `Cookie` header carries it
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies()
            .into_iter()
            .find_map(|(k, v)| (k == name).then_some(v))
    }

    /// All cookies sent with the request, in header order.
    pub fn cookies(&self) -> Vec<(String, String)> {
        self.get_header("Cookie")
            .map(|header| parse_cookies(header))
            .unwrap_or_default()
    }

    /// Check if the request has a URL-encoded form body.
    pub fn is_form(&self) -> bool {
        self.get_header("Content-Type").is_some_and(|content_type| {
            content_type
                .split(';')
                .next()
                .is_some_and(|media| media.trim().eq_ignore_ascii_case(FORM_URLENCODED))
        })
    }

    /// All fields of a URL-encoded form body, decoded, in body order.
    ///
    /// Empty unless the request is declared as
    /// `application/x-www-form-urlencoded`.
    pub fn form_values(&self) -> Vec<(String, String)> {
        if !self.is_form() {
            return Vec::new();
        }
        parse_urlencoded(&String::from_utf8_lossy(&self.body))
    }

    /// Get a form value.
    ///
    /// # Arguments
    ///
    /// * `name` - The field name
    ///
    /// # Returns
    ///
    /// The first decoded value for `name` in a URL-encoded body, falling back
    /// to the query string, or `None` if neither carries it
    pub fn form_value(&self, name: &str) -> Option<String> {
        self.form_values()
            .into_iter()
            .find_map(|(k, v)| (k == name).then_some(v))
            .or_else(|| {
                let (_, query) = self.path.split_once('?')?;
                parse_urlencoded(query)
                    .into_iter()
                    .find_map(|(k, v)| (k == name).then_some(v))
            })
    }
}

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Split `a=1&b=two+words` into decoded pairs.
fn parse_urlencoded(input: &str) -> Vec<(String, String)> {
    let decode = |s: &str| percent_decode_str(&s.replace('+', " ")).decode_utf8_lossy().into_owned();
    input
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (decode(k), decode(v)),
            None => (decode(pair), String::new()),
        })
        .collect()
}

/// Locate the end of the header section.
///
/// # Returns
///
/// The offset at which the body starts, or `None` if the blank line that
/// terminates the headers has not been received yet
pub fn find_head_end(input: &[u8]) -> Option<usize> {
    let crlf = input.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4);
    let lf = input.windows(2).position(|w| w == b"\n\n").map(|i| i + 2);
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Read the declared body length from a set of headers.
///
/// # Returns
///
/// `Ok(None)` when no Content-Length header is present, or an error if the
/// header is not a valid non-negative integer
pub fn content_length(headers: &HashMap<String, String>) -> Result<Option<usize>, Error> {
    let value = headers
        .iter()
        .find_map(|(k, v)| k.eq_ignore_ascii_case("Content-Length").then_some(v));
    match value {
        Some(value) => value
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| Error::InvalidContentLength(value.clone())),
        None => Ok(None),
    }
}

/// Parse an HTTP request from a byte slice.
///
/// # Arguments
///
/// * `input` - A byte slice containing the HTTP request to parse
///
/// # Returns
///
/// The parsed HTTP request, or an error if the request is invalid. Bytes
/// after the header section become the body, truncated to Content-Length
/// when that header is present.
pub fn parse_request(input: &[u8]) -> Result<HttpRequest, Error> {
    if input.is_empty() {
        return Err(Error::EmptyRequest);
    }

    // Split the head from the body
    let (head, rest) = match find_head_end(input) {
        Some(end) => (&input[..end], &input[end..]),
        None => (input, &input[input.len()..]),
    };

    let head_str = match std::str::from_utf8(head) {
        Ok(s) => s,
        Err(_) => return Err(Error::MalformedRequestLine("Invalid UTF-8".to_string())),
    };

    let mut lines = head_str.lines();

    // Parse the request line
    let request_line = match lines.next() {
        Some(line) => line,
        None => return Err(Error::EmptyRequest),
    };

    // Split the request line into method, path, and version
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(Error::MalformedRequestLine(request_line.to_string()));
    }

    let method = Method::from_str(parts[0])?;

    let path = parts[1].to_string();
    if !path.starts_with('/') && path != "*" {
        return Err(Error::InvalidPath);
    }

    let version = HttpVersion::from_str(parts[2])?;

    // Parse the headers
    let mut headers = HashMap::new();
    for line in lines {
        // Empty line indicates the end of headers
        if line.is_empty() {
            break;
        }

        let Some((name, value)) = line.split_once(':') else {
            return Err(Error::InvalidHeaderFormat);
        };
        headers.insert(name.trim().to_string(), value.trim().to_string());
    }

    if version == HttpVersion::Http11 && !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("Host")) {
        return Err(Error::MissingHeader("Host".to_string()));
    }

    let body = match content_length(&headers)? {
        Some(len) => rest[..len.min(rest.len())].to_vec(),
        None => rest.to_vec(),
    };

    Ok(HttpRequest::with_body(method, path, version, headers, body))
}
