//! HTTP cookies: building `Set-Cookie` values and reading the `Cookie` header.

use std::fmt;
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Lifetime of a cookie that does not set one, in seconds.
pub const DEFAULT_EXPIRY_SECS: i64 = 3600;

/// The `SameSite` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    /// Sent on cross-site requests too. Browsers only accept this together
    /// with `Secure`.
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        };
        f.write_str(value)
    }
}

/// A cookie to send to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// Defaults to `/`.
    pub path: String,
    pub domain: Option<String>,
    /// Absolute expiry time.
    pub expires: Option<DateTime<Utc>>,
    /// Lifetime in seconds; zero or less deletes the cookie.
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
}

impl Cookie {
    /// A cookie for the root path that expires in an hour.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: "/".to_string(),
            domain: None,
            expires: Some(Utc::now() + Duration::seconds(DEFAULT_EXPIRY_SECS)),
            max_age: None,
            secure: false,
            http_only: false,
            same_site: SameSite::default(),
        }
    }

    /// A cookie that tells the client to drop `name`.
    pub fn removal(name: impl Into<String>) -> Self {
        Self {
            value: String::new(),
            expires: Utc.timestamp_opt(0, 0).single(),
            max_age: Some(0),
            ..Self::new(name, "")
        }
    }

    /// Set the lifetime, in seconds, as both `Expires` and `Max-Age`.
    pub fn with_ttl(mut self, secs: i64) -> Self {
        self.expires = Some(Utc::now() + Duration::seconds(secs));
        self.max_age = Some(secs);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    /// Render the value of a `Set-Cookie` header.
    pub fn to_header_value(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);
        if !self.path.is_empty() {
            out.push_str(&format!("; Path={}", self.path));
        }
        if let Some(domain) = &self.domain {
            out.push_str(&format!("; Domain={domain}"));
        }
        if let Some(expires) = self.expires {
            out.push_str(&format!("; Expires={}", expires.format("%a, %d %b %Y %H:%M:%S GMT")));
        }
        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={}", max_age.max(0)));
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        out.push_str(&format!("; SameSite={}", self.same_site));
        out
    }
}

/// Parse a `Cookie` request header into (name, value) pairs.
///
/// Pairs without `=` or with an empty name are skipped. Values wrapped in
/// double quotes are unquoted.
pub fn parse_cookies(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_value_defaults() {
        let value = Cookie::new("name", "test").to_header_value();
        assert!(value.starts_with("name=test; Path=/; Expires="));
        assert!(value.ends_with(" GMT; SameSite=Lax"));
        assert!(!value.contains("Max-Age"));
    }

    #[test]
    fn test_header_value_attributes() {
        let value = Cookie::new("id", "42")
            .with_domain("example.com")
            .with_ttl(60)
            .secure(true)
            .http_only(true)
            .with_same_site(SameSite::Strict)
            .to_header_value();
        assert!(value.contains("; Domain=example.com"));
        assert!(value.contains("; Max-Age=60"));
        assert!(value.contains("; HttpOnly; Secure; SameSite=Strict"));
    }

    #[test]
    fn test_removal() {
        let value = Cookie::removal("session_id").to_header_value();
        assert!(value.starts_with("session_id=; Path=/"));
        assert!(value.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
        assert!(value.contains("Max-Age=0"));
    }

    #[test]
    fn test_parse_cookies() {
        let cookies = parse_cookies(r#"a=1; b="two" ;c=; =skipped; flag"#);
        assert_eq!(cookies, vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "two".to_string()),
            ("c".to_string(), String::new()),
        ]);
        assert!(parse_cookies("").is_empty());
    }
}
