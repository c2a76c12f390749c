//! Serving files from a directory under a URL prefix.

use std::path::{Path, PathBuf};
use log::debug;

use crate::parser::{HttpRequest, Method};
use crate::server::{HttpResponse, StatusCode};

/// A directory mounted under a URL prefix.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    /// Directory the files are read from.
    directory: PathBuf,
    /// URL prefix without a trailing slash; empty for the root.
    prefix: String,
}

impl StaticFiles {
    /// Mount `directory` under `prefix`.
    pub fn new(directory: impl Into<PathBuf>, prefix: &str) -> Self {
        let prefix = format!("/{}", prefix.trim_matches('/'));
        Self {
            directory: directory.into(),
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    /// The URL prefix this mount answers for.
    pub fn prefix(&self) -> &str {
        if self.prefix.is_empty() { "/" } else { &self.prefix }
    }

    /// Check whether a decoded request path falls under this mount.
    pub fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Serve the file addressed by `path`.
    ///
    /// Directories resolve to their `index.html`. Paths that try to leave the
    /// mounted directory, and any file system error, produce a 404 so that
    /// no file system detail reaches the client.
    pub async fn serve(&self, request: &HttpRequest, path: &str) -> HttpResponse {
        if !matches!(request.method, Method::GET | Method::HEAD) {
            return HttpResponse::text(StatusCode::MethodNotAllowed).with_header("Allow", "GET, HEAD");
        }

        let Some(mut full) = self.resolve(path) else {
            debug!("Rejected static path {path}");
            return HttpResponse::text(StatusCode::NotFound);
        };

        match tokio::fs::metadata(&full).await {
            Ok(meta) if meta.is_dir() => full.push("index.html"),
            Ok(_) => {}
            Err(e) => {
                debug!("Static file {} unavailable: {e}", full.display());
                return HttpResponse::text(StatusCode::NotFound);
            }
        }

        let bytes = match tokio::fs::read(&full).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Static file {} unavailable: {e}", full.display());
                return HttpResponse::text(StatusCode::NotFound);
            }
        };

        let mut response = HttpResponse::new(StatusCode::Ok)
            .with_content_type(content_type(&full))
            .with_body_bytes(bytes);
        if request.method == Method::HEAD {
            response.body.clear();
        }
        response
    }

    /// Map a request path to a file system path inside the mount.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = path.strip_prefix(self.prefix.as_str())?;
        let mut full = self.directory.clone();
        for component in relative.split('/') {
            match component {
                "" | "." => continue,
                ".." => return None,
                c if c.contains('\\') || c.contains('\0') => return None,
                c => full.push(c),
            }
        }
        Some(full)
    }
}

/// Guess a content type from a file extension.
fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_normalisation() {
        assert_eq!(StaticFiles::new("public", "/assets/").prefix(), "/assets");
        assert_eq!(StaticFiles::new("public", "assets").prefix(), "/assets");
        assert_eq!(StaticFiles::new("public", "/").prefix(), "/");
    }

    #[test]
    fn test_matches_whole_segments() {
        let files = StaticFiles::new("public", "/assets");
        assert!(files.matches("/assets"));
        assert!(files.matches("/assets/app.css"));
        assert!(!files.matches("/assetsx/app.css"));
        assert!(!files.matches("/other"));

        let root = StaticFiles::new("public", "/");
        assert!(root.matches("/anything/at/all"));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let files = StaticFiles::new("public", "/assets");
        assert_eq!(files.resolve("/assets/css/app.css"), Some(PathBuf::from("public/css/app.css")));
        assert_eq!(files.resolve("/assets/../secret"), None);
        assert_eq!(files.resolve("/assets/a/../../secret"), None);
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type(Path::new("index.html")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("logo.PNG")), "image/png");
        assert_eq!(content_type(Path::new("blob")), "application/octet-stream");
    }
}
