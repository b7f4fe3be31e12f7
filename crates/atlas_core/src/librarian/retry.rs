use super::{FetchError, FetchErrorKind, FetchResult};
use log::warn;
use std::time::Duration;

const DEFAULT_MAX_ATTEMPTS: u32 = 50;
const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

/// Bounded retry of a fallible source call.
///
/// Only allow-listed kinds are retried; anything else fails on first sight.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    pub retryable: Vec<FetchErrorKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
            retryable: vec![
                FetchErrorKind::Timeout,
                FetchErrorKind::Connection,
                FetchErrorKind::RateLimited,
            ],
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
            retryable: Vec::new(),
        }
    }

    pub fn is_retryable(&self, kind: FetchErrorKind) -> bool {
        self.retryable.contains(&kind)
    }

    /// Runs `call` until it succeeds, fails non-retryably, or attempts run out.
    ///
    /// `call` receives the 1-based attempt number. Sleeps `backoff` between
    /// attempts; the final error is returned unchanged.
    pub fn run<T, F>(&self, label: &str, mut call: F) -> FetchResult<T>
    where
        F: FnMut(u32) -> FetchResult<T>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if attempt < max_attempts && self.is_retryable(err.kind) => {
                    warn!(
                        "event=fetch_retry module=librarian status=warn call={} attempt={} max_attempts={} kind={}",
                        label,
                        attempt,
                        max_attempts,
                        err.kind.as_str()
                    );
                    if !self.backoff.is_zero() {
                        std::thread::sleep(self.backoff);
                    }
                    attempt += 1;
                }
                Err(err) => return Err(exhausted(err, attempt)),
            }
        }
    }
}

fn exhausted(err: FetchError, attempts: u32) -> FetchError {
    if attempts > 1 {
        FetchError::new(
            err.kind,
            format!("{} (after {attempts} attempts)", err.message),
        )
    } else {
        err
    }
}

#[cfg(test)]
mod tests {
    use super::RetryPolicy;
    use crate::librarian::{FetchError, FetchErrorKind};
    use std::time::Duration;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Duration::ZERO,
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn defaults_match_source_limits() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 50);
        assert_eq!(policy.backoff, Duration::from_secs(2));
        assert!(policy.is_retryable(FetchErrorKind::RateLimited));
        assert!(!policy.is_retryable(FetchErrorKind::NotFound));
    }

    #[test]
    fn retries_transient_errors_until_success() {
        let mut calls = 0;
        let result = fast_policy(5).run("test", |attempt| {
            calls += 1;
            if attempt < 3 {
                Err(FetchError::new(FetchErrorKind::Timeout, "slow"))
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result, Ok(3));
        assert_eq!(calls, 3);
    }

    #[test]
    fn stops_after_max_attempts() {
        let mut calls = 0;
        let result: Result<(), _> = fast_policy(4).run("test", |_| {
            calls += 1;
            Err(FetchError::new(FetchErrorKind::Connection, "down"))
        });
        let err = result.expect_err("exhausted retries must fail");
        assert_eq!(err.kind, FetchErrorKind::Connection);
        assert_eq!(calls, 4);
    }

    #[test]
    fn fails_fast_on_non_retryable_kind() {
        let mut calls = 0;
        let result: Result<(), _> = fast_policy(10).run("test", |_| {
            calls += 1;
            Err(FetchError::new(FetchErrorKind::Malformed, "bad json"))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
