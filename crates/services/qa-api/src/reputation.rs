//! Reputation adjustments with optimistic concurrency.
//!
//! Each step reads the current value and writes `current + delta` only if the
//! value is still `current`. A lost race is retried with a fresh read, up to
//! `max_attempts` times.
use std::sync::Arc;

use crate::metrics;
use crate::store::{PrefsStore, StoreError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Clone)]
pub struct ReputationUpdater {
    prefs: Arc<dyn PrefsStore>,
    max_attempts: u32,
}

impl ReputationUpdater {
    pub fn new(prefs: Arc<dyn PrefsStore>, max_attempts: u32) -> Self {
        Self {
            prefs,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn prefs(&self) -> &Arc<dyn PrefsStore> {
        &self.prefs
    }

    /// Adds `delta` to the user's reputation and returns the new value.
    pub async fn adjust(&self, user_id: &str, delta: i64) -> Result<i64, StoreError> {
        for attempt in 1..=self.max_attempts {
            let current = self.prefs.get_prefs(user_id).await?.reputation;
            let next = current + delta;
            if self
                .prefs
                .compare_and_set_reputation(user_id, current, next)
                .await?
            {
                metrics::record_reputation_step(delta);
                tracing::info!(
                    user_id = %user_id,
                    delta,
                    reputation = next,
                    "reputation adjusted"
                );
                return Ok(next);
            }

            metrics::record_reputation_conflict();
            tracing::warn!(
                user_id = %user_id,
                attempt,
                max_attempts = self.max_attempts,
                "reputation changed concurrently, retrying"
            );
        }

        metrics::record_reputation_exhausted();
        Err(StoreError::Conflict(format!(
            "reputation of {} kept changing; gave up after {} attempts",
            user_id, self.max_attempts
        )))
    }

    /// Applies each step in order and returns the final value.
    ///
    /// An error stops the sequence; steps already applied stay applied.
    pub async fn apply_steps(&self, user_id: &str, steps: &[i64]) -> Result<Option<i64>, StoreError> {
        let mut last = None;
        for &delta in steps {
            last = Some(self.adjust(user_id, delta).await?);
        }
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryPrefsStore;
    use async_trait::async_trait;
    use qa_types::{PrefsPatch, UserPrefs};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Loses the first `failures` conditional writes, as if another writer won.
    struct ContendedPrefs {
        inner: InMemoryPrefsStore,
        failures: AtomicU32,
        cas_calls: AtomicU32,
    }

    impl ContendedPrefs {
        fn new(reputation: i64, failures: u32) -> Self {
            Self {
                inner: InMemoryPrefsStore::with_reputations([("author", reputation)]),
                failures: AtomicU32::new(failures),
                cas_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl PrefsStore for ContendedPrefs {
        async fn get_prefs(&self, user_id: &str) -> Result<UserPrefs, StoreError> {
            self.inner.get_prefs(user_id).await
        }

        async fn update_prefs(&self, user_id: &str, patch: PrefsPatch) -> Result<UserPrefs, StoreError> {
            self.inner.update_prefs(user_id, patch).await
        }

        async fn compare_and_set_reputation(
            &self,
            user_id: &str,
            expected: i64,
            new: i64,
        ) -> Result<bool, StoreError> {
            self.cas_calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Ok(false);
            }
            self.inner.compare_and_set_reputation(user_id, expected, new).await
        }
    }

    #[tokio::test]
    async fn retries_until_write_lands() {
        let prefs = Arc::new(ContendedPrefs::new(5, 2));
        let updater = ReputationUpdater::new(prefs.clone(), 5);

        assert_eq!(updater.adjust("author", 1).await.unwrap(), 6);
        assert_eq!(prefs.cas_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_attempt_budget() {
        let prefs = Arc::new(ContendedPrefs::new(5, 10));
        let updater = ReputationUpdater::new(prefs.clone(), 3);

        let err = updater.adjust("author", 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(prefs.cas_calls.load(Ordering::SeqCst), 3);
        assert_eq!(prefs.get_prefs("author").await.unwrap().reputation, 5);
    }

    #[tokio::test]
    async fn steps_apply_in_order() {
        let prefs = Arc::new(InMemoryPrefsStore::with_reputations([("author", 6)]));
        let updater = ReputationUpdater::new(prefs.clone(), DEFAULT_MAX_ATTEMPTS);

        assert_eq!(updater.apply_steps("author", &[-1, -1]).await.unwrap(), Some(4));
        assert_eq!(updater.apply_steps("author", &[]).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adjustments_are_not_lost() {
        let prefs = Arc::new(InMemoryPrefsStore::new());
        let updater = ReputationUpdater::new(prefs.clone(), 100);

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let updater = updater.clone();
                tokio::spawn(async move { updater.adjust("author", 1).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(prefs.get_prefs("author").await.unwrap().reputation, 50);
    }
}
