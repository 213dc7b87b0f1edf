//! Rate limiting primitives for auth flows.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

// Stale windows are swept on a fixed cadence of checks instead of a timer.
const SWEEP_EVERY_CHECKS: u64 = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RateLimitAction {
    SignIn,
    ResetPassword,
    VerifyResetPassword,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision;
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check_ip(&self, _ip: Option<&str>, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

/// In-memory fixed-window limiter keyed by (action, client IP).
///
/// Requests without a resolvable IP share a single bucket so they cannot
/// bypass the limit.
#[derive(Debug)]
pub struct FixedWindowRateLimiter {
    window: Duration,
    limit: u32,
    checks: AtomicU64,
    windows: Mutex<HashMap<(RateLimitAction, String), (Instant, u32)>>,
}

impl FixedWindowRateLimiter {
    #[must_use]
    pub fn new(window: Duration, limit: u32) -> Self {
        Self {
            window,
            limit,
            checks: AtomicU64::new(0),
            windows: Mutex::new(HashMap::new()),
        }
    }
}

impl RateLimiter for FixedWindowRateLimiter {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision {
        let key = (action, ip.unwrap_or("unknown").to_string());
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY_CHECKS == 0 {
            let window = self.window;
            windows.retain(|_, (started, _)| started.elapsed() < window);
        }

        let now = Instant::now();
        let entry = windows.entry(key).or_insert((now, 0));
        if entry.0.elapsed() >= self.window {
            *entry = (now, 0);
        }
        if entry.1 >= self.limit {
            return RateLimitDecision::Limited;
        }
        entry.1 += 1;
        RateLimitDecision::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_rate_limiter_allows() {
        let limiter = NoopRateLimiter;
        assert_eq!(
            limiter.check_ip(None, RateLimitAction::SignIn),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::ResetPassword),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn fixed_window_limits_after_budget() {
        let limiter = FixedWindowRateLimiter::new(Duration::from_secs(60), 3);
        for _ in 0..3 {
            assert_eq!(
                limiter.check_ip(Some("1.2.3.4"), RateLimitAction::SignIn),
                RateLimitDecision::Allowed
            );
        }
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::SignIn),
            RateLimitDecision::Limited
        );
    }

    #[test]
    fn fixed_window_is_scoped_per_ip_and_action() {
        let limiter = FixedWindowRateLimiter::new(Duration::from_secs(60), 1);
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::SignIn),
            RateLimitDecision::Allowed
        );
        // Other IPs and other actions keep their own budget.
        assert_eq!(
            limiter.check_ip(Some("5.6.7.8"), RateLimitAction::SignIn),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::ResetPassword),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::SignIn),
            RateLimitDecision::Limited
        );
    }

    #[test]
    fn fixed_window_resets_after_window() {
        let limiter = FixedWindowRateLimiter::new(Duration::from_millis(1), 1);
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::SignIn),
            RateLimitDecision::Allowed
        );
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::SignIn),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn missing_ip_shares_a_bucket() {
        let limiter = FixedWindowRateLimiter::new(Duration::from_secs(60), 1);
        assert_eq!(
            limiter.check_ip(None, RateLimitAction::SignIn),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(None, RateLimitAction::SignIn),
            RateLimitDecision::Limited
        );
    }
}
