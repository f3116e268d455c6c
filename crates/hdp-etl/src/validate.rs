//! Batch validation
//!
//! Record-level problems (missing fields, corrupt prices, duplicates) are
//! dropped and counted, never raised. The only error here is structural: a
//! batch whose schema lacks the identifier column entirely cannot be
//! reconciled and aborts its pipeline.

use std::collections::HashMap;

use hdp_common::{HdpError, Result};
use tracing::info;

use crate::records::{Listing, Observation, KEY_FIELD};

/// Upper bound on a sane listing price; anything at or above this is a
/// corrupted feed value.
pub const PRICE_CEILING: f64 = 100_000_000.0;

/// Clean one listing batch.
///
/// Drops records with a null/absent identifier or a price outside
/// `(0, PRICE_CEILING)`, then deduplicates by key keeping the last-seen
/// occurrence. Errors only if no record in the batch carries the identifier
/// field at all.
pub fn validate_listings(batch: Vec<Listing>, category: &str) -> Result<Vec<Listing>> {
    if batch.is_empty() {
        info!(category, "Empty batch, nothing to validate");
        return Ok(batch);
    }

    if !batch.iter().any(|l| l.has_field(KEY_FIELD)) {
        return Err(HdpError::DataValidation(format!(
            "{category} batch is missing the '{KEY_FIELD}' column"
        )));
    }

    let initial = batch.len();

    let cleaned = batch.into_iter().filter(|listing| {
        let valid_key = listing.key().is_some();
        let valid_price = listing
            .price()
            .map(|p| p > 0.0 && p < PRICE_CEILING)
            .unwrap_or(false);
        valid_key && valid_price
    });

    let deduped = dedup_keep_last(cleaned, |l| l.key());

    let removed = initial - deduped.len();
    if removed > 0 {
        info!(category, removed, "Validation removed invalid listing records");
    }
    info!(category, count = deduped.len(), "Validated listings");

    Ok(deduped)
}

/// Clean one observation batch: drop non-finite values and deduplicate by
/// `(date, series_id)` keeping the last-seen occurrence. Observations are
/// already typed, so there is no structural failure mode.
pub fn validate_observations(batch: Vec<Observation>) -> Vec<Observation> {
    let initial = batch.len();

    let deduped = dedup_keep_last(
        batch.into_iter().filter(|o| o.value.is_finite()),
        |o| Some((o.date, o.series_id.clone())),
    );

    let removed = initial - deduped.len();
    if removed > 0 {
        info!(removed, "Validation removed invalid metric observations");
    }

    deduped
}

/// Deduplicate by key, keeping the last occurrence's value. Items whose key
/// function returns `None` are kept (the caller filters those if needed).
pub(crate) fn dedup_keep_last<T, K, F>(items: impl Iterator<Item = T>, key_fn: F) -> Vec<T>
where
    K: std::hash::Hash + Eq,
    F: Fn(&T) -> Option<K>,
{
    let mut out: Vec<T> = Vec::new();
    let mut seen: HashMap<K, usize> = HashMap::new();

    for item in items {
        match key_fn(&item) {
            Some(key) => {
                if let Some(&idx) = seen.get(&key) {
                    out[idx] = item;
                } else {
                    seen.insert(key, out.len());
                    out.push(item);
                }
            },
            None => out.push(item),
        }
    }

    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn listing(value: serde_json::Value) -> Listing {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_empty_batch_passes() {
        assert!(validate_listings(Vec::new(), "ForSale").unwrap().is_empty());
    }

    #[test]
    fn test_missing_key_column_is_structural_error() {
        let batch = vec![
            listing(json!({"price": 100000})),
            listing(json!({"price": 200000, "address": "x"})),
        ];
        let err = validate_listings(batch, "ForSale").unwrap_err();
        assert!(matches!(err, HdpError::DataValidation(_)));
    }

    #[test]
    fn test_drops_null_key_and_bad_prices() {
        let batch = vec![
            listing(json!({"zpid": 1, "price": 300000})),
            listing(json!({"zpid": null, "price": 250000})),
            listing(json!({"zpid": 3, "price": 0})),
            listing(json!({"zpid": 4, "price": -5})),
            listing(json!({"zpid": 5, "price": 200_000_000i64})),
            listing(json!({"zpid": 6})),
        ];
        let cleaned = validate_listings(batch, "ForSale").unwrap();
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].key().unwrap(), "1");
    }

    #[test]
    fn test_dedup_keeps_last_occurrence() {
        let batch = vec![
            listing(json!({"zpid": 1, "price": 300000})),
            listing(json!({"zpid": 2, "price": 150000})),
            listing(json!({"zpid": 1, "price": 310000})),
        ];
        let cleaned = validate_listings(batch, "ForSale").unwrap();
        assert_eq!(cleaned.len(), 2);
        let k1 = cleaned.iter().find(|l| l.key().as_deref() == Some("1")).unwrap();
        assert_eq!(k1.price(), Some(310000.0));
    }

    #[test]
    fn test_mixed_key_types_dedup_together() {
        let batch = vec![
            listing(json!({"zpid": 42, "price": 100000})),
            listing(json!({"zpid": "42", "price": 110000})),
        ];
        let cleaned = validate_listings(batch, "ForSale").unwrap();
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].price(), Some(110000.0));
    }

    #[test]
    fn test_observation_validation() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let batch = vec![
            Observation {
                date,
                metric_name: "median_price".into(),
                series_id: "MEDLISPRI34980".into(),
                value: 450000.0,
            },
            Observation {
                date,
                metric_name: "median_price".into(),
                series_id: "MEDLISPRI34980".into(),
                value: 455000.0,
            },
            Observation {
                date,
                metric_name: "active_listings".into(),
                series_id: "ACTLISCOU34980".into(),
                value: f64::NAN,
            },
        ];

        let cleaned = validate_observations(batch);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].value, 455000.0);
    }
}
