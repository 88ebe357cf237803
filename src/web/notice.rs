//! One-shot messages shown on the next page a browser renders.
//!
//! The message text itself stays on the server; the browser only carries a
//! random key in a cookie, so display names never have to survive cookie
//! encoding.

use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

pub const NOTICE_COOKIE: &str = "parcel_notice";
/// Browsers that never follow their redirect leave entries behind. Past
/// this many, the oldest entry makes room for the new one.
const MAX_PENDING: usize = 4096;
/// Unread notices older than this are discarded.
const NOTICE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}
impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: Level::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: Level::Error, message: message.into() }
    }
}

struct Pending {
    queued_at: Instant,
    notices: Vec<Notice>,
}

/// Notices waiting to be shown, keyed by the browser's notice cookie.
#[derive(Default)]
pub struct Notices {
    pending: Mutex<HashMap<String, Pending>>,
}

impl Notices {
    /// Queue a notice for whoever holds `jar`, issuing them a key if they
    /// don't already have one.
    pub async fn push(&self, jar: CookieJar, notice: Notice) -> CookieJar {
        let key = match jar.get(NOTICE_COOKIE) {
            Some(cookie) => cookie.value().to_string(),
            None => Uuid::new_v4().to_string(),
        };
        let now = Instant::now();
        let mut pending = self.pending.lock().await;
        if !pending.contains_key(&key) && pending.len() >= MAX_PENDING {
            pending.retain(|_, entry| now.duration_since(entry.queued_at) < NOTICE_TTL);
            if pending.len() >= MAX_PENDING {
                let oldest = pending.iter().min_by_key(|(_, entry)| entry.queued_at).map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    tracing::debug!(pending = pending.len(), "Evicting oldest unread notice");
                    pending.remove(&oldest);
                }
            }
        }
        let entry = pending.entry(key.clone()).or_insert_with(|| Pending { queued_at: now, notices: Vec::new() });
        entry.queued_at = now;
        entry.notices.push(notice);
        drop(pending);
        jar.add(
            Cookie::build((NOTICE_COOKIE, key))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax),
        )
    }

    /// Remove and return everything queued for `jar`, clearing its cookie.
    pub async fn take(&self, jar: CookieJar) -> (CookieJar, Vec<Notice>) {
        let Some(key) = jar.get(NOTICE_COOKIE).map(|cookie| cookie.value().to_string()) else {
            return (jar, Vec::new());
        };
        let notices = self
            .pending
            .lock()
            .await
            .remove(&key)
            .filter(|entry| entry.queued_at.elapsed() < NOTICE_TTL)
            .map(|entry| entry.notices)
            .unwrap_or_default();
        (jar.remove(Cookie::build(NOTICE_COOKIE).path("/")), notices)
    }
}
