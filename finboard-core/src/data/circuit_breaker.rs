//! Circuit breaker shared by every provider that talks to the same host.
//!
//! Each HTTP status is classified once here. A refusal (403) opens the
//! breaker immediately; rate limits and server errors count toward a
//! threshold of consecutive failures. Authentication and not-found answers
//! are the caller's problem and leave the breaker alone. While open, every
//! request is refused until the cooldown has elapsed, and the session keeps
//! serving what is already cached.

use reqwest::StatusCode;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Consecutive failures before the breaker opens.
pub const FAILURE_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open { tripped_at: Instant },
}

/// What a response status means for the request that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    Success,
    /// 403: the host refuses us; stop asking.
    Refused,
    /// 429: retry after backing off.
    RateLimited,
    /// 401: session credentials missing or stale.
    Unauthorized,
    NotFound,
    /// Any other non-success status; retryable.
    Failed,
}

#[derive(Debug)]
struct Health {
    state: BreakerState,
    consecutive_failures: u32,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    health: Mutex<Health>,
    cooldown: Duration,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            health: Mutex::new(Health {
                state: BreakerState::Closed,
                consecutive_failures: 0,
            }),
            cooldown,
        }
    }

    fn health(&self) -> std::sync::MutexGuard<'_, Health> {
        self.health.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn is_allowed(&self) -> bool {
        let mut h = self.health();
        match h.state {
            BreakerState::Closed => true,
            BreakerState::Open { tripped_at } if tripped_at.elapsed() >= self.cooldown => {
                h.state = BreakerState::Closed;
                h.consecutive_failures = 0;
                tracing::info!("circuit breaker closed after cooldown");
                true
            }
            BreakerState::Open { .. } => false,
        }
    }

    /// Classify a response status and update the breaker accordingly.
    pub fn record_status(&self, status: StatusCode) -> ResponseClass {
        let class = match status {
            s if s.is_success() => ResponseClass::Success,
            StatusCode::FORBIDDEN => ResponseClass::Refused,
            StatusCode::TOO_MANY_REQUESTS => ResponseClass::RateLimited,
            StatusCode::UNAUTHORIZED => ResponseClass::Unauthorized,
            StatusCode::NOT_FOUND => ResponseClass::NotFound,
            _ => ResponseClass::Failed,
        };
        match class {
            ResponseClass::Success => self.record_success(),
            ResponseClass::Refused => self.trip(),
            ResponseClass::RateLimited | ResponseClass::Failed => self.record_failure(),
            ResponseClass::Unauthorized | ResponseClass::NotFound => {}
        }
        class
    }

    pub fn record_success(&self) {
        self.health().consecutive_failures = 0;
    }

    /// Count a failed attempt: a rate limit, server error or dropped connection.
    pub fn record_failure(&self) {
        let mut h = self.health();
        h.consecutive_failures += 1;
        if h.consecutive_failures >= FAILURE_THRESHOLD && h.state == BreakerState::Closed {
            h.state = BreakerState::Open {
                tripped_at: Instant::now(),
            };
            tracing::warn!(failures = h.consecutive_failures, "circuit breaker opened");
        }
    }

    pub fn trip(&self) {
        self.health().state = BreakerState::Open {
            tripped_at: Instant::now(),
        };
        tracing::warn!("circuit breaker opened by provider refusal");
    }

    pub fn state(&self) -> BreakerState {
        self.health().state
    }

    pub fn remaining_cooldown(&self) -> Duration {
        match self.health().state {
            BreakerState::Closed => Duration::ZERO,
            BreakerState::Open { tripped_at } => self.cooldown.saturating_sub(tripped_at.elapsed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(Duration::from_secs(60))
    }

    #[test]
    fn forbidden_opens_at_once() {
        let cb = breaker();
        let class = cb.record_status(StatusCode::FORBIDDEN);
        assert_eq!(class, ResponseClass::Refused);
        assert!(!cb.is_allowed());
        assert!(cb.remaining_cooldown() > Duration::ZERO);
    }

    #[test]
    fn repeated_server_errors_open() {
        let cb = breaker();
        let first = cb.record_status(StatusCode::BAD_GATEWAY);
        let second = cb.record_status(StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(first, ResponseClass::Failed);
        assert_eq!(second, ResponseClass::RateLimited);
        assert!(cb.is_allowed());
        cb.record_status(StatusCode::SERVICE_UNAVAILABLE);
        assert!(!cb.is_allowed());
    }

    #[test]
    fn stale_crumb_and_unknown_symbol_do_not_count() {
        let cb = breaker();
        for _ in 0..5 {
            let stale = cb.record_status(StatusCode::UNAUTHORIZED);
            let missing = cb.record_status(StatusCode::NOT_FOUND);
            assert_eq!(stale, ResponseClass::Unauthorized);
            assert_eq!(missing, ResponseClass::NotFound);
        }
        assert_eq!(cb.state(), BreakerState::Closed);
    }

    #[test]
    fn success_clears_the_failure_run() {
        let cb = breaker();
        cb.record_status(StatusCode::TOO_MANY_REQUESTS);
        cb.record_status(StatusCode::TOO_MANY_REQUESTS);
        let ok = cb.record_status(StatusCode::OK);
        assert_eq!(ok, ResponseClass::Success);
        cb.record_status(StatusCode::TOO_MANY_REQUESTS);
        assert!(cb.is_allowed());
    }

    #[test]
    fn shared_breaker_closes_after_cooldown() {
        let cb = std::sync::Arc::new(CircuitBreaker::new(Duration::from_millis(10)));
        let fundamentals_side = std::sync::Arc::clone(&cb);
        cb.record_status(StatusCode::FORBIDDEN);
        assert!(!fundamentals_side.is_allowed());
        std::thread::sleep(Duration::from_millis(15));
        assert!(fundamentals_side.is_allowed());
        assert_eq!(cb.state(), BreakerState::Closed);
    }
}
