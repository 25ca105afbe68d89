//! Credential port
//!
//! The bearer token lives in two places: a durable key-value store read by
//! the client and a cookie of the same name read by the route guard. Every
//! write goes through [`CredentialPort`] so the two never drift apart.

pub mod cookie;
pub mod store;

use common::{AppConfig, ApiResult, ClientError};
use std::sync::Arc;
use tracing::{debug, warn};

pub use cookie::{CookieJar, expired_cookie, session_cookie};
pub use store::{FileStore, KeyValueStore, MemoryStore};

/// Single entry point for reading, writing and clearing the persisted token
#[derive(Clone)]
pub struct CredentialPort {
    key: String,
    durable: Arc<dyn KeyValueStore>,
    cookies: Arc<CookieJar>,
}

impl CredentialPort {
    pub fn new(
        key: impl Into<String>,
        durable: Arc<dyn KeyValueStore>,
        cookies: Arc<CookieJar>,
    ) -> Self {
        Self {
            key: key.into(),
            durable,
            cookies,
        }
    }

    /// Port backed by a fresh in-memory store and cookie jar
    pub fn in_memory(key: impl Into<String>) -> Self {
        Self::new(key, Arc::new(MemoryStore::new()), Arc::new(CookieJar::new()))
    }

    /// Port using the configured credentials file, or memory when unset
    pub fn from_config(config: &AppConfig) -> Self {
        let durable: Arc<dyn KeyValueStore> = match &config.credentials_file {
            Some(path) => Arc::new(FileStore::new(path)),
            None => Arc::new(MemoryStore::new()),
        };
        Self::new(config.token_key.clone(), durable, Arc::new(CookieJar::new()))
    }

    /// Storage key and cookie name
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// Persisted token, preferring the durable store over the cookie
    pub fn token(&self) -> Option<String> {
        let durable = self.durable.get(&self.key).unwrap_or_else(|e| {
            warn!("Failed to read durable credential: {:#}", e);
            None
        });

        durable
            .filter(|t| !t.is_empty())
            .or_else(|| self.cookies.get(&self.key))
            .filter(|t| !t.is_empty())
    }

    /// Persist `token` in both the durable store and the cookie
    pub fn store(&self, token: &str) -> ApiResult<()> {
        self.durable
            .set(&self.key, token)
            .map_err(|e| ClientError::Storage(format!("{:#}", e)))?;
        self.cookies.assign(&session_cookie(&self.key, token));
        debug!("Persisted credential under {}", self.key);
        Ok(())
    }

    /// Remove the token from both locations
    ///
    /// The cookie is expired even when the durable removal fails.
    pub fn clear(&self) -> ApiResult<()> {
        let durable = self.durable.remove(&self.key);
        self.cookies.assign(&expired_cookie(&self.key));
        debug!("Cleared credential under {}", self.key);

        durable.map_err(|e| ClientError::Storage(format!("{:#}", e)))
    }
}
