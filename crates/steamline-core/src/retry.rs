//! Retry with exponential backoff for upstream requests

use std::fmt;
use std::time::Duration;

use indicatif::ProgressBar;
use rand::Rng;

/// First wait after a failure
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Upper bound for the exponential part of the wait
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Upper bound (exclusive) for the random jitter added to each wait
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(500);

/// Backoff settings for one retried operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_jitter: Duration,
    /// `None` retries transient failures forever
    pub max_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            max_jitter: DEFAULT_MAX_JITTER,
            max_retries: None,
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff for retry number `attempt` (1-based), without jitter:
    /// `min(initial * 2^(attempt-1), max)`.
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .checked_mul(1u32 << exponent)
            .map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }

    /// Random jitter in `[0, max_jitter)`.
    pub fn jitter(&self) -> Duration {
        if self.max_jitter.is_zero() {
            return Duration::ZERO;
        }
        self.max_jitter.mul_f64(rand::thread_rng().gen::<f64>())
    }

    /// Wait before retry number `attempt`.
    ///
    /// A nonzero server hint is honored as-is; otherwise backoff plus jitter.
    pub fn wait_for(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        match hint {
            Some(h) if !h.is_zero() => h,
            _ => self.backoff_duration(attempt) + self.jitter(),
        }
    }
}

/// Blocking wait between attempts. Swapped for a recording clock in tests.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// [`Sleeper`] backed by `std::thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Outcome of one failed attempt, as classified by the caller.
#[derive(Debug)]
pub enum Attempt<E> {
    /// Worth retrying; `retry_after` carries a server hint if there was one
    Transient {
        error: E,
        retry_after: Option<Duration>,
    },
    /// Retrying cannot help
    Fatal(E),
}

impl<E> Attempt<E> {
    pub fn transient(error: E) -> Self {
        Self::Transient {
            error,
            retry_after: None,
        }
    }

    pub fn throttled(error: E, retry_after: Option<Duration>) -> Self {
        Self::Transient { error, retry_after }
    }
}

/// Final failure of a retried operation.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The configured retry ceiling was reached
    Exhausted { attempts: u32, last: E },
    Fatal(E),
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { attempts, last } => {
                write!(f, "gave up after {attempts} attempts: {last}")
            }
            Self::Fatal(e) => write!(f, "{e}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Exhausted { last, .. } => Some(last),
            Self::Fatal(e) => Some(e),
        }
    }
}

/// Retry a fallible operation with exponential backoff.
///
/// Transient failures are logged, reported on the progress bar, waited out
/// on `sleeper` and retried until success, a fatal failure, or the policy's
/// retry ceiling. The attempt counter is local to this call.
pub fn retry_with_backoff<T, E: fmt::Display>(
    label: &str,
    policy: &RetryPolicy,
    sleeper: &impl Sleeper,
    pb: &ProgressBar,
    mut attempt_fn: impl FnMut() -> Result<T, Attempt<E>>,
) -> Result<T, RetryError<E>> {
    let mut retries = 0u32;
    loop {
        match attempt_fn() {
            Ok(v) => return Ok(v),
            Err(Attempt::Transient { error, retry_after }) => {
                if policy.max_retries.is_some_and(|max| retries >= max) {
                    log::debug!("{label}: giving up after {} attempts: {error}", retries + 1);
                    return Err(RetryError::Exhausted {
                        attempts: retries + 1,
                        last: error,
                    });
                }
                retries += 1;
                let wait = policy.wait_for(retries, retry_after);
                pb.set_message(format!("retry {retries} in {:.1}s...", wait.as_secs_f64()));
                log::warn!("{label}: attempt {retries} failed: {error}, retrying in {wait:.1?}");
                sleeper.sleep(wait);
            }
            Err(Attempt::Fatal(e)) => {
                log::debug!("{label}: failed permanently: {e}");
                return Err(RetryError::Fatal(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSleeper(RefCell<Vec<Duration>>);

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.0.borrow_mut().push(duration);
        }
    }

    fn no_jitter() -> RetryPolicy {
        RetryPolicy {
            max_jitter: Duration::ZERO,
            ..Default::default()
        }
    }

    #[test]
    fn backoff_exponential() {
        let policy = no_jitter();
        assert_eq!(policy.backoff_duration(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_duration(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_duration(3), Duration::from_secs(4));
    }

    #[test]
    fn backoff_capped() {
        let policy = RetryPolicy {
            max_backoff: Duration::from_secs(5),
            ..no_jitter()
        };
        assert_eq!(policy.backoff_duration(4), Duration::from_secs(5));
        assert_eq!(policy.backoff_duration(40), Duration::from_secs(5));
        assert_eq!(policy.backoff_duration(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn jitter_within_bound() {
        let policy = RetryPolicy::default();
        for _ in 0..200 {
            assert!(policy.jitter() < DEFAULT_MAX_JITTER);
        }
        assert_eq!(no_jitter().jitter(), Duration::ZERO);
    }

    #[test]
    fn hint_overrides_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.wait_for(5, Some(Duration::from_secs(3))),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn zero_hint_falls_back_to_backoff() {
        let policy = no_jitter();
        assert_eq!(
            policy.wait_for(2, Some(Duration::ZERO)),
            Duration::from_secs(2)
        );
        assert_eq!(policy.wait_for(3, None), Duration::from_secs(4));
    }

    #[test]
    fn waits_grow_across_consecutive_failures() {
        let policy = RetryPolicy::default();
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;
        let result = retry_with_backoff("test", &policy, &sleeper, &ProgressBar::hidden(), || {
            calls += 1;
            if calls <= 3 {
                Err(Attempt::transient("connection reset"))
            } else {
                Ok(calls)
            }
        });

        assert_eq!(result.unwrap(), 4);
        let waits = sleeper.0.into_inner();
        assert_eq!(waits.len(), 3);
        assert!(waits.windows(2).all(|w| w[0] <= w[1]), "{waits:?}");
        for w in &waits {
            assert!(*w <= policy.max_backoff + policy.max_jitter);
        }
    }

    #[test]
    fn exhausted_after_ceiling() {
        let policy = RetryPolicy {
            max_retries: Some(2),
            ..no_jitter()
        };
        let sleeper = RecordingSleeper::default();
        let result: Result<(), _> =
            retry_with_backoff("test", &policy, &sleeper, &ProgressBar::hidden(), || {
                Err(Attempt::transient("down"))
            });

        match result {
            Err(RetryError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last, "down");
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
        assert_eq!(sleeper.0.borrow().len(), 2);
    }

    #[test]
    fn fatal_stops_without_waiting() {
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;
        let result: Result<(), _> = retry_with_backoff(
            "test",
            &RetryPolicy::default(),
            &sleeper,
            &ProgressBar::hidden(),
            || {
                calls += 1;
                Err(Attempt::Fatal("HTTP 500"))
            },
        );

        assert!(matches!(result, Err(RetryError::Fatal("HTTP 500"))));
        assert_eq!(calls, 1);
        assert!(sleeper.0.borrow().is_empty());
    }

    #[test]
    fn throttle_hint_is_slept() {
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;
        let _ = retry_with_backoff(
            "test",
            &RetryPolicy::default(),
            &sleeper,
            &ProgressBar::hidden(),
            || {
                calls += 1;
                if calls == 1 {
                    Err(Attempt::throttled("429", Some(Duration::from_secs(7))))
                } else {
                    Ok(())
                }
            },
        );
        assert_eq!(*sleeper.0.borrow(), vec![Duration::from_secs(7)]);
    }

    #[test]
    fn display_exhausted() {
        let err: RetryError<&str> = RetryError::Exhausted {
            attempts: 4,
            last: "timeout",
        };
        assert_eq!(format!("{err}"), "gave up after 4 attempts: timeout");
    }
}
