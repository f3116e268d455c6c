//! Reconciliation
//!
//! Pure merge of freshly fetched records with the previously persisted set
//! for the same table. Fresh always wins on key collision ("keep last"); an
//! empty or keyless persisted set (first run, legacy table) means the fresh
//! batch is used as-is. No I/O happens here.

use std::hash::Hash;

use chrono::NaiveDate;

use crate::records::{Listing, Observation};
use crate::validate::dedup_keep_last;

/// Merge `existing` and `fresh`, deduplicating by key with the most recently
/// fetched version winning.
pub fn merge_by_key<T, K, F>(existing: Vec<T>, fresh: Vec<T>, key_fn: F) -> Vec<T>
where
    K: Hash + Eq,
    F: Fn(&T) -> Option<K>,
{
    if existing.is_empty() {
        return fresh;
    }

    // A persisted set without the key column cannot be matched against;
    // treat it like a first run.
    if !existing.iter().any(|item| key_fn(item).is_some()) {
        return fresh;
    }

    dedup_keep_last(existing.into_iter().chain(fresh), key_fn)
}

/// Reconcile listing batches on the zpid key.
pub fn merge_listings(existing: Vec<Listing>, fresh: Vec<Listing>) -> Vec<Listing> {
    merge_by_key(existing, fresh, |l| l.key())
}

/// Reconcile observation batches on the (date, series_id) key.
pub fn merge_observations(existing: Vec<Observation>, fresh: Vec<Observation>) -> Vec<Observation> {
    merge_by_key(existing, fresh, |o| {
        Some::<(NaiveDate, String)>((o.date, o.series_id.clone()))
    })
}
