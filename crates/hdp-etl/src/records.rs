//! Raw listing records
//!
//! The listings feed is wide and schema-flexible: beyond the handful of
//! fields the pipeline cares about (zpid, price, units) a record carries
//! whatever the upstream API returned that day. Records are therefore kept
//! as JSON objects end to end and only the fields with pipeline semantics
//! get typed accessors.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field holding the external unique identifier.
pub const KEY_FIELD: &str = "zpid";

/// Field holding the listing price.
pub const PRICE_FIELD: &str = "price";

/// Field holding the embedded unit collection on multi-unit rentals.
pub const UNITS_FIELD: &str = "units";

/// One raw listing row as returned by the listings API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Listing(pub Map<String, Value>);

impl Listing {
    pub fn new() -> Self {
        Listing(Map::new())
    }

    /// Raw field access.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Whether the record carries the field at all (null counts as present).
    pub fn has_field(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    /// The unique key, normalized to a string.
    ///
    /// The feed is inconsistent about the identifier's JSON type: older
    /// records carry it as a number, newer ones as a string. Both normalize
    /// to the same key so reconciliation matches across generations.
    pub fn key(&self) -> Option<String> {
        match self.0.get(KEY_FIELD) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    Some(i.to_string())
                } else if let Some(u) = n.as_u64() {
                    Some(u.to_string())
                } else {
                    // fractional numbers are never valid identifiers
                    None
                }
            },
            _ => None,
        }
    }

    /// The listing price as a number, if present and numeric.
    ///
    /// Accepts a JSON number or a numeric string; anything else reads as
    /// absent and gets dropped by validation.
    pub fn price(&self) -> Option<f64> {
        match self.0.get(PRICE_FIELD) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// The raw embedded unit collection, whatever shape the feed gave it.
    pub fn units(&self) -> Option<&Value> {
        self.0.get(UNITS_FIELD)
    }
}

impl Default for Listing {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Map<String, Value>> for Listing {
    fn from(map: Map<String, Value>) -> Self {
        Listing(map)
    }
}

/// One economic time-series observation.
///
/// Identity key is `(date, series_id)`; `metric_name` is the configured
/// human-readable alias for the series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub metric_name: String,
    pub series_id: String,
    pub value: f64,
}

impl Observation {
    /// The unique key used for deduplication and upserts.
    pub fn key(&self) -> (NaiveDate, &str) {
        (self.date, self.series_id.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing(value: Value) -> Listing {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_key_normalizes_number_and_string() {
        let a = listing(json!({"zpid": 12345678}));
        let b = listing(json!({"zpid": "12345678"}));
        assert_eq!(a.key().unwrap(), "12345678");
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_key_rejects_fractional_numbers() {
        // a truncated fraction would alias distinct ids onto one key
        assert_eq!(listing(json!({"zpid": 12345678.5})).key(), None);
        assert_eq!(listing(json!({"zpid": 12345678.9})).key(), None);
    }

    #[test]
    fn test_key_accepts_ids_beyond_i64() {
        let big = u64::MAX;
        assert_eq!(listing(json!({ "zpid": big })).key().unwrap(), big.to_string());
    }

    #[test]
    fn test_key_absent_or_null() {
        assert_eq!(listing(json!({"price": 100})).key(), None);
        assert_eq!(listing(json!({"zpid": null})).key(), None);
        assert_eq!(listing(json!({"zpid": ""})).key(), None);
    }

    #[test]
    fn test_price_number_and_numeric_string() {
        assert_eq!(listing(json!({"price": 310000})).price(), Some(310000.0));
        assert_eq!(listing(json!({"price": "1850"})).price(), Some(1850.0));
        assert_eq!(listing(json!({"price": "call for price"})).price(), None);
        assert_eq!(listing(json!({"price": null})).price(), None);
    }

    #[test]
    fn test_round_trips_unknown_fields() {
        let raw = json!({
            "zpid": 1,
            "price": 200000,
            "address": "123 Main St, Nashville, TN",
            "latitude": 36.16,
            "longitude": -86.78,
            "carouselPhotos": [{"url": "https://example.com/1.jpg"}]
        });
        let record = listing(raw.clone());
        assert_eq!(serde_json::to_value(&record).unwrap(), raw);
    }
}
