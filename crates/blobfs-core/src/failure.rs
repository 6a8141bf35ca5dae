//! Shared failure slot for one write session.
//!
//! A write session runs several part uploads concurrently with the
//! caller's own `write` calls. The first failure from any of them has to
//! fail everything still in flight on the same file, exactly once each.
//! [`FailureSlot`] is that broadcast: a set-once slot every operation
//! races against via [`FailureSlot::race`].

use std::future::Future;

use tokio::sync::watch;

use crate::error::{BlobFileError, BlobFileResult};

/// A set-once, first-writer-wins failure slot shared by every operation
/// on one write session.
#[derive(Debug, Clone)]
pub(crate) struct FailureSlot {
    tx: watch::Sender<Option<BlobFileError>>,
}

impl FailureSlot {
    /// Create an empty slot.
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Record a failure. The first caller wins; later calls are no-ops.
    pub(crate) fn fail(&self, err: BlobFileError) {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(err);
            true
        });
    }

    /// The recorded failure, if any.
    pub(crate) fn get(&self) -> Option<BlobFileError> {
        self.tx.borrow().clone()
    }

    /// Resolve once a failure has been recorded.
    async fn first_error(&self) -> BlobFileError {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(err) = rx.borrow_and_update().clone() {
                return err;
            }
            // `self` holds a sender, so the channel cannot close while this
            // future is alive.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Race `fut` against the slot: whichever resolves first wins and the
    /// other continuation is discarded.
    pub(crate) async fn race<T, F>(&self, fut: F) -> BlobFileResult<T>
    where
        F: Future<Output = BlobFileResult<T>>,
    {
        tokio::select! {
            res = fut => res,
            err = self.first_error() => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_should_start_empty() {
        let slot = FailureSlot::new();
        assert_eq!(slot.get(), None);
    }

    #[test]
    fn test_should_keep_first_failure() {
        let slot = FailureSlot::new();
        slot.fail(BlobFileError::transport("first"));
        slot.fail(BlobFileError::transport("second"));
        assert_eq!(slot.get(), Some(BlobFileError::transport("first")));
    }

    #[tokio::test]
    async fn test_should_resolve_race_with_future_result() {
        let slot = FailureSlot::new();
        let res = slot.race(async { Ok(42) }).await;
        assert_eq!(res, Ok(42));
    }

    #[tokio::test]
    async fn test_should_resolve_race_with_recorded_failure() {
        let slot = FailureSlot::new();
        slot.fail(BlobFileError::Cancelled);
        let res = slot
            .race(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await;
        assert_eq!(res, Err(BlobFileError::Cancelled));
    }

    #[tokio::test]
    async fn test_should_wake_racers_when_failure_arrives() {
        let slot = FailureSlot::new();
        let racer = {
            let slot = slot.clone();
            tokio::spawn(async move {
                slot.race(std::future::pending::<BlobFileResult<()>>()).await
            })
        };
        // Let the racer park on the slot first.
        tokio::task::yield_now().await;
        slot.fail(BlobFileError::transport("boom"));

        let res = racer.await.expect("test task");
        assert_eq!(res, Err(BlobFileError::transport("boom")));
    }

    #[tokio::test]
    async fn test_should_broadcast_same_failure_to_all_racers() {
        let slot = FailureSlot::new();
        let racers: Vec<_> = (0..4)
            .map(|_| {
                let slot = slot.clone();
                tokio::spawn(async move {
                    slot.race(std::future::pending::<BlobFileResult<()>>()).await
                })
            })
            .collect();
        tokio::task::yield_now().await;
        slot.fail(BlobFileError::transport("boom"));

        for racer in racers {
            let res = racer.await.expect("test task");
            assert_eq!(res, Err(BlobFileError::transport("boom")));
        }
    }
}
