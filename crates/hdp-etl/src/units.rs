//! Multi-unit listing normalizer
//!
//! Some rental listings embed a collection of rentable units (one building,
//! many floor plans). The feed is sloppy about how that collection is
//! encoded: sometimes a JSON array, sometimes the array stringified, and
//! sometimes a Python-literal rendering with single quotes and
//! `True`/`False`/`None`. Decoding tries each strategy in a fixed order and
//! treats irrecoverable strings as "no units" rather than failing the
//! record.

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::records::{Listing, UNITS_FIELD};

/// Suffix appended to unit-level field names when merged into the parent,
/// so `price_unit` coexists with the parent's `price`.
pub const UNIT_SUFFIX: &str = "_unit";

/// Explicit outcome of decoding an embedded unit collection.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitsOutcome {
    /// Decoded to a list of unit objects
    Units(Vec<Map<String, Value>>),
    /// Field was null or an empty collection
    NoUnits,
    /// None of the decoding strategies applied
    Unparseable,
}

/// Decode a raw `units` value.
///
/// Strategy order: native array, string as JSON, string repaired from
/// Python-literal notation.
pub fn parse_units(value: &Value) -> UnitsOutcome {
    match value {
        Value::Null => UnitsOutcome::NoUnits,
        Value::Array(items) => collect_units(items),
        Value::String(s) => parse_units_str(s),
        _ => UnitsOutcome::Unparseable,
    }
}

fn parse_units_str(s: &str) -> UnitsOutcome {
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(s) {
        return collect_units(&items);
    }

    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(&repair_python_literal(s)) {
        return collect_units(&items);
    }

    UnitsOutcome::Unparseable
}

/// Rewrite Python-literal notation into JSON: single-quoted strings,
/// capitalized booleans, `None`. Quote replacement is blunt, so a value
/// containing an apostrophe comes out unparseable and is handled as such.
fn repair_python_literal(s: &str) -> String {
    s.replace("True", "true")
        .replace("False", "false")
        .replace("None", "null")
        .replace('\'', "\"")
}

fn collect_units(items: &[Value]) -> UnitsOutcome {
    let units: Vec<Map<String, Value>> = items
        .iter()
        .filter_map(|item| item.as_object().cloned())
        .collect();

    if units.is_empty() {
        UnitsOutcome::NoUnits
    } else {
        UnitsOutcome::Units(units)
    }
}

/// Expand multi-unit listings into one row per unit.
///
/// Each output row inherits every parent field and carries the unit's own
/// fields under [`UNIT_SUFFIX`]. Listings without a unit collection (or with
/// an undecodable one) pass through unchanged.
pub fn explode_units(batch: Vec<Listing>) -> Vec<Listing> {
    let mut out = Vec::with_capacity(batch.len());
    let mut unparseable = 0usize;

    for listing in batch {
        let outcome = match listing.get(UNITS_FIELD) {
            None => {
                out.push(listing);
                continue;
            },
            Some(value) => parse_units(value),
        };

        match outcome {
            UnitsOutcome::NoUnits => out.push(listing),
            UnitsOutcome::Unparseable => {
                unparseable += 1;
                warn!(key = ?listing.key(), "Undecodable units field, keeping parent row only");
                out.push(listing);
            },
            UnitsOutcome::Units(units) => {
                for unit in units {
                    let mut row = listing.clone();
                    for (field, value) in unit {
                        row.insert(format!("{field}{UNIT_SUFFIX}"), value);
                    }
                    out.push(row);
                }
            },
        }
    }

    if unparseable > 0 {
        info!(count = unparseable, "Listings with undecodable unit collections");
    }

    out
}
