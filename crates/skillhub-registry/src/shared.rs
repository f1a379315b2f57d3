//! Swappable registry handle for concurrent readers

use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

use crate::registry::Registry;

/// Shared handle to the current registry.
///
/// Readers take an `Arc` snapshot and keep using it for the whole query;
/// a rebuild swaps in a new registry without touching existing snapshots.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    current: Arc<RwLock<Arc<Registry>>>,
}

impl SharedRegistry {
    /// Wrap a built registry
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(registry))),
        }
    }

    /// Get the current registry
    #[must_use]
    pub fn snapshot(&self) -> Arc<Registry> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Swap in a freshly built registry, returning the previous one
    pub fn replace(&self, registry: Registry) -> Arc<Registry> {
        let next = Arc::new(registry);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        info!(
            "Registry swapped: {} -> {} documents",
            guard.len(),
            next.len()
        );
        std::mem::replace(&mut *guard, next)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::registry::tests::doc;
    use std::thread;

    #[test]
    fn test_snapshot_survives_replace() {
        let shared = SharedRegistry::new(Registry::build(vec![doc("old", &[], &[])]).unwrap());
        let before = shared.snapshot();

        let previous = shared.replace(
            Registry::build(vec![doc("new", &[], &[]), doc("newer", &[], &[])]).unwrap(),
        );

        assert!(before.contains("old"));
        assert!(previous.contains("old"));
        assert_eq!(shared.snapshot().len(), 2);
        assert!(!shared.snapshot().contains("old"));
    }

    #[test]
    fn test_concurrent_readers_see_whole_registries() {
        let shared = SharedRegistry::new(Registry::build(vec![doc("a", &[], &[])]).unwrap());

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        let len = shared.snapshot().len();
                        assert!(len == 1 || len == 3);
                    }
                })
            })
            .collect();

        shared.replace(
            Registry::build(vec![
                doc("a", &[], &[]),
                doc("b", &[], &[]),
                doc("c", &[], &[]),
            ])
            .unwrap(),
        );

        for reader in readers {
            reader.join().unwrap();
        }
    }
}
