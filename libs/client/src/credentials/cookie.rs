//! Cookie mirror of the persisted token
//!
//! [`CookieJar`] follows `document.cookie` assignment semantics: assigning a
//! cookie with an `Expires` in the past or a non-positive `Max-Age` deletes it.
//! Every accepted assignment is also recorded, so a server can send the same
//! writes back as `Set-Cookie` headers.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};

const EPOCH_EXPIRY: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Cookie string that stores `value` under `name` for every path
pub fn session_cookie(name: &str, value: &str) -> String {
    format!("{name}={value}; Path=/; SameSite=Lax")
}

/// Cookie string that removes `name`
pub fn expired_cookie(name: &str) -> String {
    format!("{name}=; Expires={EPOCH_EXPIRY}; Path=/")
}

#[derive(Debug, Clone)]
struct StoredCookie {
    value: String,
    expires: Option<DateTime<Utc>>,
}

/// In-process cookie jar
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: RwLock<HashMap<String, StoredCookie>>,
    writes: Mutex<Vec<String>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a `name=value; attr=...` assignment
    pub fn assign(&self, cookie: &str) {
        let mut parts = cookie.split(';').map(str::trim);
        let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
            return;
        };
        let name = name.trim();
        if name.is_empty() {
            return;
        }

        let now = Utc::now();
        let mut expires = None;
        for attribute in parts {
            let (key, val) = attribute.split_once('=').unwrap_or((attribute, ""));
            match key.trim().to_ascii_lowercase().as_str() {
                "expires" => {
                    if let Ok(at) = DateTime::parse_from_rfc2822(val.trim()) {
                        expires = Some(at.with_timezone(&Utc));
                    }
                }
                // Max-Age wins over Expires
                "max-age" => {
                    if let Ok(seconds) = val.trim().parse::<i64>() {
                        expires = Some(if seconds <= 0 {
                            now
                        } else {
                            Duration::try_seconds(seconds)
                                .and_then(|d| now.checked_add_signed(d))
                                .unwrap_or(DateTime::<Utc>::MAX_UTC)
                        });
                        break;
                    }
                }
                _ => {}
            }
        }

        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(cookie.trim().to_string());

        let mut cookies = self.cookies.write().unwrap_or_else(PoisonError::into_inner);
        if expires.is_some_and(|at| at <= now) {
            cookies.remove(name);
        } else {
            cookies.insert(
                name.to_string(),
                StoredCookie {
                    value: value.trim().to_string(),
                    expires,
                },
            );
        }
    }

    /// Current value of `name`, if set and not expired
    pub fn get(&self, name: &str) -> Option<String> {
        let cookies = self.cookies.read().unwrap_or_else(PoisonError::into_inner);
        cookies
            .get(name)
            .filter(|c| c.expires.is_none_or(|at| at > Utc::now()))
            .map(|c| c.value.clone())
    }

    /// Assignments made since the last call, oldest first
    pub fn take_writes(&self) -> Vec<String> {
        std::mem::take(&mut *self.writes.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
