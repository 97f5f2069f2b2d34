//! Bounded retry with exponential backoff.
//!
//! The delay before retry `k` (1-based, counting the attempt that failed) is
//! `base_delay * 2^(k-1)`. No sleep follows the final attempt.

use super::FetchError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// How many times to try a request and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(2u32.pow(exp))
    }
}

/// Blocks the calling thread between attempts. Injected so tests can record
/// delays instead of waiting them out.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Real sleeper backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Outcome of one failed attempt.
#[derive(Debug)]
pub enum AttemptError {
    /// Worth retrying (transport failure, non-2xx, undecodable body).
    Transient(String),
    /// Retrying cannot help; returned immediately.
    Fatal(FetchError),
}

/// Run `attempt` up to `policy.max_attempts` times.
///
/// `attempt` receives the 1-based attempt number.
pub fn retry_with_backoff<T>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut attempt: impl FnMut(u32) -> Result<T, AttemptError>,
) -> Result<T, FetchError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();

    for n in 1..=max_attempts {
        match attempt(n) {
            Ok(value) => return Ok(value),
            Err(AttemptError::Fatal(e)) => return Err(e),
            Err(AttemptError::Transient(message)) => {
                if n < max_attempts {
                    let delay = policy.delay_after(n);
                    warn!(
                        attempt = n,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %message,
                        "request failed, retrying"
                    );
                    sleeper.sleep(delay);
                } else {
                    warn!(attempt = n, error = %message, "request failed, giving up");
                }
                last_error = message;
            }
        }
    }

    Err(FetchError::Transport {
        attempts: max_attempts,
        message: last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::RecordingSleeper;
    use crate::fetch::SourceKind;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(100))
    }

    #[test]
    fn delays_double_each_attempt() {
        let p = policy();
        assert_eq!(p.delay_after(1), Duration::from_millis(100));
        assert_eq!(p.delay_after(2), Duration::from_millis(200));
        assert_eq!(p.delay_after(3), Duration::from_millis(400));
    }

    #[test]
    fn default_policy_matches_service_constants() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.delay_after(1), Duration::from_millis(1500));
        assert_eq!(p.delay_after(2), Duration::from_millis(3000));
    }

    #[test]
    fn first_success_does_not_sleep() {
        let sleeper = RecordingSleeper::new();
        let out = retry_with_backoff(&policy(), &sleeper, |_| Ok::<_, AttemptError>(7));
        assert_eq!(out.unwrap(), 7);
        assert!(sleeper.delays().is_empty());
    }

    #[test]
    fn succeeds_on_third_attempt_after_two_sleeps() {
        let sleeper = RecordingSleeper::new();
        let out = retry_with_backoff(&policy(), &sleeper, |n| {
            if n < 3 {
                Err(AttemptError::Transient(format!("boom {n}")))
            } else {
                Ok(n)
            }
        });
        assert_eq!(out.unwrap(), 3);
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
    }

    #[test]
    fn exhaustion_reports_last_error_without_trailing_sleep() {
        let sleeper = RecordingSleeper::new();
        let mut calls = 0;
        let out: Result<(), _> = retry_with_backoff(&policy(), &sleeper, |n| {
            calls += 1;
            Err(AttemptError::Transient(format!("fail {n}")))
        });
        assert_eq!(calls, 3);
        assert_eq!(sleeper.delays().len(), 2);
        match out {
            Err(FetchError::Transport { attempts, message }) => {
                assert_eq!(attempts, 3);
                assert_eq!(message, "fail 3");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn fatal_error_stops_immediately() {
        let sleeper = RecordingSleeper::new();
        let mut calls = 0;
        let out: Result<(), _> = retry_with_backoff(&policy(), &sleeper, |_| {
            calls += 1;
            Err(AttemptError::Fatal(FetchError::EmptyUpstream {
                kind: SourceKind::YahooQuote,
            }))
        });
        assert_eq!(calls, 1);
        assert!(sleeper.delays().is_empty());
        assert!(matches!(out, Err(FetchError::EmptyUpstream { .. })));
    }

    #[test]
    fn zero_attempts_is_treated_as_one() {
        let sleeper = RecordingSleeper::new();
        let p = RetryPolicy {
            max_attempts: 0,
            base_delay: Duration::from_millis(1),
        };
        let out: Result<(), _> =
            retry_with_backoff(&p, &sleeper, |_| Err(AttemptError::Transient("x".into())));
        assert!(matches!(out, Err(FetchError::Transport { attempts: 1, .. })));
    }
}
