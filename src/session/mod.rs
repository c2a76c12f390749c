//! Cookie-backed sessions.
//!
//! A session id (a random UUID) travels in a cookie; the data lives in a
//! [`Store`]. Reading a session pushes its expiry back by the session's
//! ttl.

mod store;

use std::sync::Arc;
use std::time::Duration;
use log::debug;
use uuid::Uuid;

use crate::cookie::Cookie;
use crate::parser::HttpRequest;
use crate::server::{Error, HttpResponse};

pub use store::{MemoryStore, SessionData, Store, DEFAULT_TTL};

/// Browsers cap cookie lifetimes at 400 days.
const MAX_COOKIE_AGE_SECS: u64 = 400 * 24 * 3600;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "session_id";

/// Sessions kept in a store and identified by a cookie.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn Store>,
    cookie_name: String,
    ttl: Duration,
}

impl Session {
    /// Sessions in `store` with the default cookie name and a one hour ttl.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            cookie_name: SESSION_COOKIE.to_string(),
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = if ttl.is_zero() { DEFAULT_TTL } else { ttl };
        self
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a new session holding `data` and attach its cookie to `response`.
    pub async fn set(&self, response: HttpResponse, data: SessionData) -> Result<HttpResponse, Error> {
        let id = Uuid::new_v4().to_string();
        self.store.save(&id, data, self.ttl).await?;
        debug!("Started session {id}");
        Ok(response.with_cookie(&self.cookie(id)))
    }

    /// Load the session of `request`, refreshing its expiry.
    ///
    /// Returns `None` when the request has no session cookie or the session
    /// is gone.
    pub async fn get(&self, request: &HttpRequest) -> Result<Option<SessionData>, Error> {
        let Some(id) = request.cookie(&self.cookie_name) else {
            return Ok(None);
        };
        let Some(data) = self.store.get(&id).await? else {
            return Ok(None);
        };
        self.store.save(&id, data.clone(), self.ttl).await?;
        Ok(Some(data))
    }

    /// Merge `data` into the session of `request`, or start a new session
    /// when there is none.
    pub async fn update(&self, request: &HttpRequest, response: HttpResponse, data: SessionData) -> Result<HttpResponse, Error> {
        let existing = match request.cookie(&self.cookie_name) {
            Some(id) => self.store.get(&id).await?.map(|stored| (id, stored)),
            None => None,
        };
        let Some((id, mut stored)) = existing else {
            return self.set(response, data).await;
        };

        stored.extend(data);
        self.store.save(&id, stored, self.ttl).await?;
        Ok(response.with_cookie(&self.cookie(id)))
    }

    /// End the session of `request` and tell the client to drop its cookie.
    pub async fn delete(&self, request: &HttpRequest, response: HttpResponse) -> Result<HttpResponse, Error> {
        if let Some(id) = request.cookie(&self.cookie_name) {
            self.store.delete(&id).await?;
            debug!("Ended session {id}");
        }
        Ok(response.with_cookie(&Cookie::removal(self.cookie_name.as_str())))
    }

    /// Drop every session in the store.
    pub async fn reset(&self) -> Result<(), Error> {
        self.store.reset().await
    }

    fn cookie(&self, id: String) -> Cookie {
        let secs = self.ttl.as_secs().min(MAX_COOKIE_AGE_SECS) as i64;
        Cookie::new(self.cookie_name.as_str(), id)
            .with_ttl(secs)
            .http_only(true)
    }
}
