//! Bounded polling with a fixed interval.

use std::future::Future;
use std::time::Duration;

use crate::TRACING_TARGET_POLL;

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt<T, E> {
    /// The condition holds; stop polling with this value.
    Done(T),
    /// Not yet; poll again after the interval if attempts remain.
    Pending,
    /// A permanent condition; stop polling immediately.
    Abort(E),
}

/// Why polling ended without a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollError<E> {
    /// Every attempt returned [`Attempt::Pending`].
    Exhausted { attempts: u32 },
    /// A probe returned [`Attempt::Abort`].
    Aborted(E),
}

/// Fixed-interval polling policy.
///
/// The first probe runs immediately. With `max_retries = Some(n)` at most
/// `n` further probes run, each after `interval`; with `None` polling
/// continues until the probe finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between consecutive probes.
    pub interval: Duration,
    /// Maximum number of probes after the first one.
    pub max_retries: Option<u32>,
}

impl PollPolicy {
    /// Creates a policy with a bounded number of retries.
    pub fn bounded(interval: Duration, max_retries: u32) -> Self {
        Self {
            interval,
            max_retries: Some(max_retries),
        }
    }

    /// Creates a policy that polls until the probe finishes.
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_retries: None,
        }
    }

    /// Runs `probe` until it finishes or the retries run out.
    ///
    /// # Example
    /// ```ignore
    /// let policy = PollPolicy::bounded(Duration::from_millis(300), 20);
    /// let width = policy
    ///     .poll(|| async { measure().map_or(Attempt::Pending, Attempt::Done) })
    ///     .await?;
    /// ```
    pub async fn poll<F, Fut, T, E>(&self, mut probe: F) -> Result<T, PollError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Attempt<T, E>>,
    {
        let mut attempts = 0u32;

        loop {
            attempts = attempts.saturating_add(1);

            match probe().await {
                Attempt::Done(value) => return Ok(value),
                Attempt::Abort(reason) => {
                    tracing::trace!(
                        target: TRACING_TARGET_POLL,
                        attempts,
                        "Probe aborted polling"
                    );
                    return Err(PollError::Aborted(reason));
                }
                Attempt::Pending => {}
            }

            if let Some(max_retries) = self.max_retries
                && attempts > max_retries
            {
                tracing::trace!(
                    target: TRACING_TARGET_POLL,
                    attempts,
                    "Polling attempts exhausted"
                );
                return Err(PollError::Exhausted { attempts });
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_done_on_first_attempt_does_not_sleep() {
        let policy = PollPolicy::bounded(Duration::from_secs(10), 3);
        let started = tokio::time::Instant::now();

        let result = policy.poll(|| async { Attempt::<_, ()>::Done(7) }).await;

        assert_eq!(result, Ok(7));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_counts_first_attempt() {
        let policy = PollPolicy::bounded(Duration::from_millis(300), 20);
        let calls = Cell::new(0u32);
        let started = tokio::time::Instant::now();

        let result = policy
            .poll(|| {
                calls.set(calls.get() + 1);
                async { Attempt::<(), ()>::Pending }
            })
            .await;

        assert_eq!(result, Err(PollError::Exhausted { attempts: 21 }));
        assert_eq!(calls.get(), 21);
        assert_eq!(started.elapsed(), Duration::from_millis(300 * 20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_stops_without_retry() {
        let policy = PollPolicy::bounded(Duration::from_millis(300), 20);
        let calls = Cell::new(0u32);

        let result = policy
            .poll(|| {
                calls.set(calls.get() + 1);
                async { Attempt::<(), _>::Abort("denied") }
            })
            .await;

        assert_eq!(result, Err(PollError::Aborted("denied")));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_polls_until_done() {
        let policy = PollPolicy::unbounded(Duration::from_millis(50));
        let calls = Cell::new(0u32);

        let result = policy
            .poll(|| {
                calls.set(calls.get() + 1);
                let current = calls.get();
                async move {
                    if current < 100 {
                        Attempt::<u32, ()>::Pending
                    } else {
                        Attempt::Done(current)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(100));
    }
}
