//! Request throttling for the contact-creation endpoint.

use std::{
    collections::VecDeque,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use dashmap::DashMap;
use tracing::warn;

use crate::{error::AppError, state::AppState};

const WINDOW: Duration = Duration::from_secs(60);
/// Tracked clients above which idle keys are swept on the next hit.
const PURGE_THRESHOLD: usize = 10_000;

/// Sliding-window limiter: at most `max_requests` per key in any 60 s span.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    hits: Arc<DashMap<String, VecDeque<Instant>>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn per_minute(max_requests: u32) -> Self {
        Self {
            hits: Arc::new(DashMap::new()),
            max_requests,
            window: WINDOW,
        }
    }

    /// Records a hit for `key` and reports whether it is within budget.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        if self.hits.len() > PURGE_THRESHOLD {
            self.purge_expired(now);
        }
        let mut entry = self.hits.entry(key.to_string()).or_default();
        while let Some(&oldest) = entry.front() {
            if now.duration_since(oldest) >= self.window {
                entry.pop_front();
            } else {
                break;
            }
        }
        if entry.len() >= self.max_requests as usize {
            return false;
        }
        entry.push_back(now);
        true
    }

    /// Drops clients whose most recent hit has left the window.
    fn purge_expired(&self, now: Instant) {
        self.hits.retain(|_, times| {
            times
                .back()
                .is_some_and(|&last| now.duration_since(last) < self.window)
        });
    }
}

/// Extractor that spends one unit of the caller's contact-creation budget.
/// Keyed by client IP; requests without connection info share one bucket.
pub struct ContactCreateQuota;

#[async_trait]
impl FromRequestParts<AppState> for ContactCreateQuota {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let key = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        if !state.contact_create_limiter.check(&key) {
            warn!(client = %key, "contact creation rate limit exceeded");
            return Err(AppError::RateLimited);
        }
        Ok(ContactCreateQuota)
    }
}
