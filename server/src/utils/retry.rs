//! Async retry utilities with exponential backoff

use std::time::Duration;

/// Default base delay in milliseconds for exponential backoff
pub const DEFAULT_BASE_DELAY_MS: u64 = 100;

/// Retry an async operation with exponential backoff.
///
/// Only errors for which `is_transient` returns true are retried. Returns the
/// operation's value on success, or `Err((error, attempts))` once attempts are
/// exhausted or a non-transient error occurs.
pub async fn retry_with_backoff_async<F, Fut, T, E, P>(
    max_attempts: u32,
    base_delay_ms: u64,
    is_transient: P,
    mut operation: F,
) -> Result<T, (E, u32)>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = max_attempts.max(1);
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempts >= max_attempts || !is_transient(&e) {
                    return Err((e, attempts));
                }
                let delay = Duration::from_millis(base_delay_ms * 2_u64.pow(attempts - 1));
                tracing::warn!(
                    error = %e,
                    attempt = attempts,
                    delay_ms = delay.as_millis(),
                    "Retrying after transient error"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[tokio::test]
    async fn test_success_on_first_try() {
        let result =
            retry_with_backoff_async(3, 10, |_: &&str| true, || async { Ok::<_, &str>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_success_after_retry() {
        let attempts = RefCell::new(0);
        let result = retry_with_backoff_async(
            3,
            1,
            |_: &&str| true,
            || {
                *attempts.borrow_mut() += 1;
                let current = *attempts.borrow();
                async move {
                    if current < 2 {
                        Err("transient error")
                    } else {
                        Ok(current)
                    }
                }
            },
        )
        .await;
        assert_eq!(result, Ok(2));
    }

    #[tokio::test]
    async fn test_failure_after_max_retries() {
        let result = retry_with_backoff_async(
            3,
            1,
            |_: &&str| true,
            || async { Err::<(), _>("persistent error") },
        )
        .await;
        let (error, attempts) = result.unwrap_err();
        assert_eq!(error, "persistent error");
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let result = retry_with_backoff_async(
            5,
            1,
            |_: &&str| false,
            || async { Err::<(), _>("bad request") },
        )
        .await;
        let (_, attempts) = result.unwrap_err();
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_runs_once() {
        let result = retry_with_backoff_async(
            0,
            1,
            |_: &&str| true,
            || async { Err::<(), _>("down") },
        )
        .await;
        assert_eq!(result.unwrap_err().1, 1);
    }
}
