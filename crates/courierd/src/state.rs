//! Pools started during bootstrap, keyed by name.

use thiserror::Error;

use crate::processing::WorkerPoolHandle;

/// Errors raised while recording pools.
#[derive(Debug, Error)]
pub enum BootstrapStateError {
    /// A pool was already recorded under the key.
    #[error("a worker pool is already recorded under '{key}'")]
    DuplicateKey {
        /// Key that was reused.
        key: String,
    },
}

/// Ordered store of running pool handles.
///
/// Entries keep their insertion order so shutdown can stop pools in reverse
/// start order.
#[derive(Debug, Default)]
pub struct BootstrapState {
    entries: Vec<(String, Box<dyn WorkerPoolHandle>)>,
}

impl BootstrapState {
    /// Builds an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `handle` under `key`; each key may be used once.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        handle: Box<dyn WorkerPoolHandle>,
    ) -> Result<(), BootstrapStateError> {
        let key = key.into();
        if self.contains(&key) {
            return Err(BootstrapStateError::DuplicateKey { key });
        }
        self.entries.push((key, handle));
        Ok(())
    }

    /// Whether a pool is recorded under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == key)
    }

    /// Pool recorded under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&dyn WorkerPoolHandle> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, handle)| handle.as_ref())
    }

    /// Mutable access to the pool recorded under `key`, for stopping it.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut (dyn WorkerPoolHandle + 'static)> {
        self.entries
            .iter_mut()
            .find(|(existing, _)| existing == key)
            .map(|(_, handle)| handle.as_mut())
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Number of recorded pools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no pool has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry, most recently inserted first.
    pub fn drain_reverse(&mut self) -> impl Iterator<Item = (String, Box<dyn WorkerPoolHandle>)> {
        let mut entries = std::mem::take(&mut self.entries);
        entries.reverse();
        entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::processing::PoolError;

    #[derive(Debug)]
    struct StubPool(&'static str);

    impl WorkerPoolHandle for StubPool {
        fn name(&self) -> &str {
            self.0
        }

        fn thread_count(&self) -> usize {
            1
        }

        fn stop(&mut self) -> Result<(), PoolError> {
            Ok(())
        }
    }

    #[rstest]
    fn rejects_a_second_entry_for_a_key() {
        let mut state = BootstrapState::new();
        state
            .insert("InboxThreadPool", Box::new(StubPool("InboxProcessor")))
            .expect("first insert");

        let error = state
            .insert("InboxThreadPool", Box::new(StubPool("InboxProcessor")))
            .expect_err("duplicate key");
        assert!(matches!(error, BootstrapStateError::DuplicateKey { ref key } if key == "InboxThreadPool"));
        assert_eq!(state.len(), 1);
    }

    #[rstest]
    fn drains_in_reverse_insertion_order() {
        let mut state = BootstrapState::new();
        for (key, name) in [
            ("InboxThreadPool", "InboxProcessor"),
            ("OutboxThreadPool", "OutboxProcessor"),
        ] {
            state.insert(key, Box::new(StubPool(name))).expect("insert");
        }
        assert_eq!(
            state.keys().collect::<Vec<_>>(),
            ["InboxThreadPool", "OutboxThreadPool"]
        );

        let drained: Vec<String> = state.drain_reverse().map(|(key, _)| key).collect();
        assert_eq!(drained, ["OutboxThreadPool", "InboxThreadPool"]);
        assert!(state.is_empty());
    }

    #[rstest]
    fn looks_up_handles_by_key() {
        let mut state = BootstrapState::new();
        state
            .insert("OutboxThreadPool", Box::new(StubPool("OutboxProcessor")))
            .expect("insert");
        assert_eq!(
            state.get("OutboxThreadPool").map(|pool| pool.name()),
            Some("OutboxProcessor")
        );
        assert!(state.get_mut("InboxThreadPool").is_none());
    }
}
