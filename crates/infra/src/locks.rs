//! Per-account mutual exclusion for multi-step balance work.
//!
//! The stores serialize individual calls, but a transfer is several calls
//! (debit, credit, append) that must not interleave with another mutation of
//! the same accounts. The registry hands out one exclusive slot per account,
//! created lazily and dropped again once nobody holds or waits on it, and
//! always acquires several slots in ascending id order so that reciprocal
//! transfers (A->B racing B->A) cannot deadlock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tinybank_core::AccountId;

type Slot = Arc<Mutex<()>>;

#[derive(Debug, Default)]
pub struct AccountLockRegistry {
    /// Guards only insert-if-absent and eviction; never held during balance work.
    slots: Mutex<HashMap<AccountId, Slot>>,
}

/// Evicts the slots of `ids` that no other caller still references.
///
/// Every clone of a slot is taken under the map lock, so a strong count of
/// one observed under that lock means the map holds the only reference.
struct Eviction<'a> {
    registry: &'a AccountLockRegistry,
    ids: Vec<&'a AccountId>,
}

impl Drop for Eviction<'_> {
    fn drop(&mut self) {
        let mut slots = self.registry.map();
        for id in &self.ids {
            if slots.get(*id).is_some_and(|slot| Arc::strong_count(slot) == 1) {
                slots.remove(*id);
            }
        }
    }
}

impl AccountLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    // The map holds no invariant a panicking holder could break.
    fn map(&self) -> MutexGuard<'_, HashMap<AccountId, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The slot for `id`, created if absent, as a single atomic step.
    fn slot(&self, id: &AccountId) -> Slot {
        self.map()
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Order in which slots for `ids` are acquired: ascending, de-duplicated.
    pub fn acquisition_order<'a>(ids: &[&'a AccountId]) -> Vec<&'a AccountId> {
        let mut ordered = ids.to_vec();
        ordered.sort();
        ordered.dedup();
        ordered
    }

    /// Run `work` while holding the slots of every account in `ids`.
    ///
    /// Slots are released when `work` returns or unwinds, and evicted if no
    /// other caller is waiting on them.
    pub fn with_locked<R>(&self, ids: &[&AccountId], work: impl FnOnce() -> R) -> R {
        // Drop order matters: guards, then our slot clones, then eviction.
        let eviction = Eviction {
            registry: self,
            ids: Self::acquisition_order(ids),
        };
        let slots: Vec<Slot> = eviction.ids.iter().map(|id| self.slot(id)).collect();

        let _guards: Vec<MutexGuard<'_, ()>> = slots
            .iter()
            .map(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner))
            .collect();

        work()
    }

    /// Number of accounts that currently have a slot.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn id(raw: &str) -> AccountId {
        AccountId::parse(raw).unwrap()
    }

    #[test]
    fn acquisition_order_ignores_direction() {
        let (a, b) = (id("a"), id("b"));
        assert_eq!(AccountLockRegistry::acquisition_order(&[&a, &b]), vec![&a, &b]);
        assert_eq!(AccountLockRegistry::acquisition_order(&[&b, &a]), vec![&a, &b]);
        assert_eq!(AccountLockRegistry::acquisition_order(&[&a, &a]), vec![&a]);
    }

    #[test]
    fn slots_live_only_while_held() {
        let registry = AccountLockRegistry::new();
        assert!(registry.is_empty());
        registry.with_locked(&[&id("a")], || assert_eq!(registry.len(), 1));
        registry.with_locked(&[&id("a"), &id("b")], || assert_eq!(registry.len(), 2));
        assert!(registry.is_empty());
    }

    #[test]
    fn waiting_caller_keeps_the_slot_alive() {
        let registry = AccountLockRegistry::new();
        let a = id("a");
        let entered = Barrier::new(2);
        let waiter_done = AtomicUsize::new(0);

        std::thread::scope(|s| {
            registry.with_locked(&[&a], || {
                s.spawn(|| {
                    entered.wait();
                    registry.with_locked(&[&a], || waiter_done.fetch_add(1, Ordering::SeqCst));
                });
                entered.wait();
                // Give the waiter time to clone the slot and block on it.
                std::thread::sleep(std::time::Duration::from_millis(20));
                assert_eq!(waiter_done.load(Ordering::SeqCst), 0);
            });
        });

        assert_eq!(waiter_done.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn slot_is_evicted_after_panic() {
        let registry = AccountLockRegistry::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            registry.with_locked::<()>(&[&id("a")], || panic!("boom"));
        }));
        assert!(result.is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn same_account_listed_twice_does_not_self_deadlock() {
        let registry = AccountLockRegistry::new();
        let a = id("a");
        assert_eq!(registry.with_locked(&[&a, &a], || 7), 7);
    }

    #[test]
    fn slot_is_exclusive() {
        let registry = AccountLockRegistry::new();
        let a = id("a");
        let inside = AtomicUsize::new(0);
        let max_seen = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..50 {
                        registry.with_locked(&[&a], || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            std::thread::yield_now();
                            inside.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                });
            }
        });

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reciprocal_pairs_do_not_deadlock() {
        let registry = AccountLockRegistry::new();
        let (a, b) = (id("a"), id("b"));
        let barrier = Barrier::new(2);
        let done = AtomicUsize::new(0);

        std::thread::scope(|s| {
            s.spawn(|| {
                barrier.wait();
                for _ in 0..1_000 {
                    registry.with_locked(&[&a, &b], || done.fetch_add(1, Ordering::SeqCst));
                }
            });
            s.spawn(|| {
                barrier.wait();
                for _ in 0..1_000 {
                    registry.with_locked(&[&b, &a], || done.fetch_add(1, Ordering::SeqCst));
                }
            });
        });

        assert_eq!(done.load(Ordering::SeqCst), 2_000);
    }

    #[test]
    fn slot_is_released_after_panic() {
        let registry = AccountLockRegistry::new();
        let a = id("a");

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            registry.with_locked::<()>(&[&a], || panic!("boom"));
        }));
        assert!(result.is_err());

        assert_eq!(registry.with_locked(&[&a], || 1), 1);
    }
}
