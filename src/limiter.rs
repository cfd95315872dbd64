use crate::cache::KvStore;
use crate::config::LimiterConfig;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub retry_after_seconds: Option<i64>,
}

impl Decision {
    fn allow() -> Self {
        Self {
            allowed: true,
            retry_after_seconds: None,
        }
    }

    fn deny(retry_after_seconds: i64) -> Self {
        Self {
            allowed: false,
            retry_after_seconds: Some(retry_after_seconds),
        }
    }
}

/// Fixed-window request admission per client address, counted in the
/// shared key/value store. The INCR is atomic and the window expiry is set
/// only on the 1st increment, so concurrent callers cannot lose updates or
/// reset each other's window.
///
/// Fails open: if the store is unreachable, requests are admitted. A cache
/// outage degrading enforcement is preferable to it taking discovery down.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn KvStore>,
    window_seconds: u64,
    max_requests: i64,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KvStore>, config: &LimiterConfig) -> Self {
        Self {
            store,
            window_seconds: config.window_seconds,
            max_requests: config.max_requests,
        }
    }

    /// Admit or reject a request from `client_ip` within the current window.
    pub async fn admit(&self, client_ip: IpAddr) -> Decision {
        let key = format!("rate-limit:{client_ip}");

        let count = match self.store.incr(&key).await {
            Ok(count) => count,
            Err(e) => {
                warn!("Rate limiter store error, failing open: {}", e.log_safe());
                return Decision::allow();
            }
        };

        // First request of a new window starts its expiry clock
        if count == 1 {
            if let Err(e) = self.store.expire(&key, self.window_seconds).await {
                warn!("Rate limiter expire failed, failing open: {}", e.log_safe());
                return Decision::allow();
            }
        }

        if count > self.max_requests {
            let retry_after = match self.store.ttl(&key).await {
                Ok(ttl) if ttl > 0 => ttl,
                Ok(_) => self.window_seconds as i64,
                Err(e) => {
                    warn!("Rate limiter TTL lookup failed: {}", e.log_safe());
                    self.window_seconds as i64
                }
            };
            debug!(
                "Rejected {} ({} requests in {}s window)",
                client_ip, count, self.window_seconds
            );
            return Decision::deny(retry_after);
        }

        Decision::allow()
    }
}
