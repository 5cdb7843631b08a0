// Retry/backoff policy
//
// Decides, per request class, whether a failed attempt is retried and
// after how long. Authorization failures never reach this policy: the
// client handles them through refresh-and-replay.

use std::time::Duration;

use crate::class::RequestClass;
use crate::error::{Error, ErrorKind};

/// Delay growth between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential {
        initial: Duration,
        factor: f64,
        max: Duration,
    },
}

impl Backoff {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential {
                initial,
                factor,
                max,
            } => {
                let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
                let scaled = initial.as_secs_f64() * factor.powi(exponent);
                if scaled.is_finite() && scaled < max.as_secs_f64() {
                    Duration::from_secs_f64(scaled)
                } else {
                    max
                }
            }
        }
    }
}

/// Outcome of [`RetryPolicy::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    GiveUp,
}

/// Bounded retry for transient failures on device traffic.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Backoff::Fixed(Duration::from_millis(1000)),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Backoff::Fixed(Duration::ZERO),
        }
    }

    /// `attempt` is the number of attempts already made (1 after the first failure).
    pub fn decide(&self, class: RequestClass, attempt: u32, error: &Error) -> RetryDecision {
        let retryable_class = matches!(
            class,
            RequestClass::DeviceCommand | RequestClass::DeviceQuery
        );
        if !retryable_class || error.kind() != ErrorKind::Transient {
            return RetryDecision::GiveUp;
        }
        if attempt > self.max_retries {
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry {
            delay: self.backoff.delay_for(attempt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeout() -> Error {
        Error::Timeout { timeout_ms: 10_000 }
    }

    #[test]
    fn device_traffic_retries_up_to_ceiling() {
        let policy = RetryPolicy::default();
        let delay = Duration::from_millis(1000);

        assert_eq!(
            policy.decide(RequestClass::DeviceQuery, 1, &timeout()),
            RetryDecision::Retry { delay }
        );
        assert_eq!(
            policy.decide(RequestClass::DeviceCommand, 2, &timeout()),
            RetryDecision::Retry { delay }
        );
        assert_eq!(
            policy.decide(RequestClass::DeviceCommand, 3, &timeout()),
            RetryDecision::GiveUp
        );
    }

    #[test]
    fn notifications_and_auth_never_retry() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.decide(RequestClass::Notification, 1, &timeout()),
            RetryDecision::GiveUp
        );
        assert_eq!(
            policy.decide(RequestClass::Auth, 1, &timeout()),
            RetryDecision::GiveUp
        );
    }

    #[test]
    fn authorization_and_server_errors_are_not_retried() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.decide(RequestClass::DeviceQuery, 1, &Error::Unauthorized),
            RetryDecision::GiveUp
        );
        let server = Error::Server {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(
            policy.decide(RequestClass::DeviceQuery, 1, &server),
            RetryDecision::GiveUp
        );
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let backoff = Backoff::Exponential {
            initial: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_millis(350),
        };
        assert_eq!(backoff.delay_for(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_for(3), Duration::from_millis(350));
        assert_eq!(backoff.delay_for(40), Duration::from_millis(350));
    }
}
