//! Document mutation notifications.

use std::pin::Pin;
use std::time::Duration;

use futures::{Stream, StreamExt};

/// Boxed, infinite stream of mutation batches.
pub type MutationStream = Pin<Box<dyn Stream<Item = MutationBatch> + Send>>;

/// One delivery of mutation records from the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MutationBatch {
    /// Number of mutation records in the batch.
    pub records: usize,
}

impl MutationBatch {
    /// Creates a batch of `records` mutation records.
    pub const fn new(records: usize) -> Self {
        Self { records }
    }

    /// Folds another batch into this one.
    pub fn absorb(&mut self, other: MutationBatch) {
        self.records = self.records.saturating_add(other.records);
    }
}

enum Step {
    Next(Option<MutationBatch>),
    Quiet,
}

/// Coalesces bursts of mutation batches.
///
/// A batch is emitted once `window` has passed without a new batch arriving;
/// every batch received in the meantime is folded into it. When the source
/// ends, any pending batch is flushed before the stream ends.
pub fn debounce<S>(source: S, window: Duration) -> MutationStream
where
    S: Stream<Item = MutationBatch> + Send + Unpin + 'static,
{
    Box::pin(async_stream::stream! {
        let mut source = source;
        let mut pending: Option<MutationBatch> = None;

        loop {
            match pending.take() {
                None => match source.next().await {
                    Some(batch) => pending = Some(batch),
                    None => break,
                },
                Some(mut coalesced) => {
                    let step = tokio::select! {
                        next = source.next() => Step::Next(next),
                        () = tokio::time::sleep(window) => Step::Quiet,
                    };

                    match step {
                        Step::Next(Some(batch)) => {
                            coalesced.absorb(batch);
                            pending = Some(coalesced);
                        }
                        Step::Next(None) => {
                            yield coalesced;
                            break;
                        }
                        Step::Quiet => yield coalesced,
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use futures::stream;
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    use super::*;

    fn channel_stream(
        mut rx: mpsc::UnboundedReceiver<MutationBatch>,
    ) -> impl Stream<Item = MutationBatch> + Send + Unpin + 'static {
        Box::pin(async_stream::stream! {
            while let Some(batch) = rx.recv().await {
                yield batch;
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_into_one_batch() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut debounced = debounce(channel_stream(rx), Duration::from_millis(150));
        let started = Instant::now();

        tokio::spawn(async move {
            for _ in 0..5 {
                tx.send(MutationBatch::new(2)).unwrap();
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let batch = debounced.next().await.unwrap();
        assert_eq!(batch.records, 10);
        // Last send at 400 ms, quiet window of 150 ms after it.
        assert_eq!(started.elapsed(), Duration::from_millis(550));
    }

    #[tokio::test(start_paused = true)]
    async fn test_separated_bursts_emit_separately() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut debounced = debounce(channel_stream(rx), Duration::from_millis(150));

        tokio::spawn(async move {
            tx.send(MutationBatch::new(1)).unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
            tx.send(MutationBatch::new(3)).unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        assert_eq!(debounced.next().await, Some(MutationBatch::new(1)));
        assert_eq!(debounced.next().await, Some(MutationBatch::new(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_batch_flushed_when_source_ends() {
        let source = stream::iter(vec![MutationBatch::new(1), MutationBatch::new(1)]);
        let debounced: Vec<_> = debounce(source, Duration::from_millis(150)).collect().await;

        assert_eq!(debounced, vec![MutationBatch::new(2)]);
    }
}
