//! Append-only transaction storage with a creation-time index.
//!
//! Records are never updated or removed. Range queries walk the date index in
//! ascending timestamp order, so history comes back sorted by `created_at`;
//! records sharing a timestamp keep their insertion order.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use tinybank_core::{AccountId, DomainError, DomainResult, Entity, TransactionId};
use tinybank_ledger::Transaction;

pub trait TransactionStore: Send + Sync {
    /// Append a transaction. Fails with `AlreadyExists` on id collision.
    fn insert(&self, transaction: Transaction) -> DomainResult<Transaction>;

    /// Transactions in `[from, to]` (inclusive) where `account_id` is sender
    /// or receiver, ascending by `created_at`.
    fn get_account_transactions(
        &self,
        account_id: &AccountId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<Transaction>>;
}

impl<S> TransactionStore for Arc<S>
where
    S: TransactionStore + ?Sized,
{
    fn insert(&self, transaction: Transaction) -> DomainResult<Transaction> {
        (**self).insert(transaction)
    }

    fn get_account_transactions(
        &self,
        account_id: &AccountId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<Transaction>> {
        (**self).get_account_transactions(account_id, from, to)
    }
}

#[derive(Debug, Default)]
struct Ledger {
    by_id: HashMap<TransactionId, Transaction>,
    /// Creation timestamp -> ids created at exactly that instant, in insertion order.
    by_date: BTreeMap<DateTime<Utc>, Vec<TransactionId>>,
}

/// In-memory transaction store for dev/tests and the default server wiring.
#[derive(Debug, Default)]
pub struct InMemoryTransactionStore {
    inner: RwLock<Ledger>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of stored transactions.
    pub fn len(&self) -> DomainResult<usize> {
        let ledger = self.inner.read().map_err(Self::poisoned)?;
        Ok(ledger.by_id.len())
    }

    pub fn is_empty(&self) -> DomainResult<bool> {
        self.len().map(|n| n == 0)
    }

    fn poisoned<T>(_: T) -> DomainError {
        DomainError::storage("transaction store lock poisoned")
    }
}

impl TransactionStore for InMemoryTransactionStore {
    fn insert(&self, transaction: Transaction) -> DomainResult<Transaction> {
        let mut ledger = self.inner.write().map_err(Self::poisoned)?;
        let id = transaction.id().clone();
        if ledger.by_id.contains_key(&id) {
            return Err(DomainError::already_exists("transaction", &id));
        }

        ledger
            .by_date
            .entry(transaction.created_at())
            .or_default()
            .push(id.clone());
        ledger.by_id.insert(id, transaction.clone());
        Ok(transaction)
    }

    fn get_account_transactions(
        &self,
        account_id: &AccountId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<Transaction>> {
        // BTreeMap::range panics on an inverted range.
        if from > to {
            return Ok(vec![]);
        }

        let ledger = self.inner.read().map_err(Self::poisoned)?;
        Ok(ledger
            .by_date
            .range(from..=to)
            .flat_map(|(_, ids)| ids.iter())
            .filter_map(|id| ledger.by_id.get(id))
            .filter(|tx| tx.involves(account_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use tinybank_core::ErrorKind;
    use tinybank_ledger::TransactionType;

    fn acc(raw: &str) -> AccountId {
        AccountId::parse(raw).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn deposit_at(id: &str, to: &str, at: DateTime<Utc>) -> Transaction {
        Transaction::restore(
            TransactionId::parse(id).unwrap(),
            at,
            TransactionType::Deposit,
            None,
            Some(acc(to)),
            10,
        )
        .unwrap()
    }

    fn transfer_at(id: &str, from: &str, to: &str, at: DateTime<Utc>) -> Transaction {
        Transaction::restore(
            TransactionId::parse(id).unwrap(),
            at,
            TransactionType::Transfer,
            Some(acc(from)),
            Some(acc(to)),
            10,
        )
        .unwrap()
    }

    fn ids(txs: &[Transaction]) -> Vec<String> {
        txs.iter().map(|t| t.id().to_string()).collect()
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let store = InMemoryTransactionStore::new();
        store.insert(deposit_at("t1", "a", t0())).unwrap();
        let err = store.insert(deposit_at("t1", "b", t0())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn history_is_sorted_and_filtered_by_account() {
        let store = InMemoryTransactionStore::new();
        // Inserted out of time order on purpose.
        store.insert(deposit_at("late", "a", t0() + Duration::minutes(2))).unwrap();
        store.insert(transfer_at("early", "b", "a", t0())).unwrap();
        store.insert(deposit_at("other", "c", t0() + Duration::minutes(1))).unwrap();
        store.insert(transfer_at("mid", "a", "c", t0() + Duration::minutes(1))).unwrap();

        let history = store
            .get_account_transactions(&acc("a"), t0() - Duration::hours(1), t0() + Duration::hours(1))
            .unwrap();
        assert_eq!(ids(&history), vec!["early", "mid", "late"]);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let store = InMemoryTransactionStore::new();
        store.insert(deposit_at("before", "a", t0() - Duration::seconds(1))).unwrap();
        store.insert(deposit_at("start", "a", t0())).unwrap();
        store.insert(deposit_at("end", "a", t0() + Duration::seconds(10))).unwrap();
        store.insert(deposit_at("after", "a", t0() + Duration::seconds(11))).unwrap();

        let history = store
            .get_account_transactions(&acc("a"), t0(), t0() + Duration::seconds(10))
            .unwrap();
        assert_eq!(ids(&history), vec!["start", "end"]);
    }

    #[test]
    fn timestamp_collisions_keep_insertion_order() {
        let store = InMemoryTransactionStore::new();
        for id in ["x", "y", "z"] {
            store.insert(deposit_at(id, "a", t0())).unwrap();
        }
        let history = store.get_account_transactions(&acc("a"), t0(), t0()).unwrap();
        assert_eq!(ids(&history), vec!["x", "y", "z"]);
    }

    #[test]
    fn window_after_everything_is_empty_not_error() {
        let store = InMemoryTransactionStore::new();
        store.insert(deposit_at("t1", "a", t0())).unwrap();
        let history = store
            .get_account_transactions(&acc("a"), t0() + Duration::days(1), t0() + Duration::days(2))
            .unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn inverted_range_is_empty() {
        let store = InMemoryTransactionStore::new();
        store.insert(deposit_at("t1", "a", t0())).unwrap();
        let history = store
            .get_account_transactions(&acc("a"), t0() + Duration::days(1), t0())
            .unwrap();
        assert!(history.is_empty());
    }

    proptest! {
        /// Property: history is ascending by created_at regardless of the
        /// order in which records were inserted, and repeated reads agree.
        #[test]
        fn history_is_ordered_and_repeatable(offsets in prop::collection::vec(0i64..10_000, 1..50)) {
            let store = InMemoryTransactionStore::new();
            for (i, offset) in offsets.iter().enumerate() {
                store
                    .insert(deposit_at(&format!("t{i}"), "a", t0() + Duration::seconds(*offset)))
                    .unwrap();
            }

            let from = t0();
            let to = t0() + Duration::seconds(10_000);
            let first = store.get_account_transactions(&acc("a"), from, to).unwrap();
            let second = store.get_account_transactions(&acc("a"), from, to).unwrap();

            prop_assert_eq!(first.len(), offsets.len());
            prop_assert!(first.windows(2).all(|w| w[0].created_at() <= w[1].created_at()));
            prop_assert_eq!(first, second);
        }
    }
}
