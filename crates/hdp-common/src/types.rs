//! Shared domain types

use serde::{Deserialize, Serialize};

/// The fixed whitelist of logical tables the pipeline is allowed to touch.
///
/// Every persistence call resolves a table through this enum before any SQL
/// is built, so a table name that did not come from this list can never reach
/// the database layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    /// For-sale property listings
    ForSale,
    /// Rental property listings (one row per rentable unit)
    Rentals,
    /// FRED economic indicator observations
    FredMetrics,
}

impl Table {
    /// All whitelisted tables, in pipeline execution order.
    pub const ALL: [Table; 3] = [Table::ForSale, Table::Rentals, Table::FredMetrics];

    /// SQL table name
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::ForSale => "for_sale_listings",
            Table::Rentals => "rental_listings",
            Table::FredMetrics => "fred_metrics",
        }
    }

    /// Columns forming the unique key for deduplication and upserts.
    pub fn unique_key(&self) -> &'static [&'static str] {
        match self {
            Table::ForSale | Table::Rentals => &["zpid"],
            Table::FredMetrics => &["date", "series_id"],
        }
    }
}

impl std::str::FromStr for Table {
    type Err = crate::HdpError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "for_sale_listings" => Ok(Table::ForSale),
            "rental_listings" => Ok(Table::Rentals),
            "fred_metrics" => Ok(Table::FredMetrics),
            other => Err(crate::HdpError::UnknownTable(other.to_string())),
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Row counts per logical table, produced once per orchestrator run.
///
/// Reporting only; nothing downstream consumes this beyond logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub for_sale: u64,
    pub rentals: u64,
    pub fred_metrics: u64,
}

impl PipelineResult {
    /// Total rows across all tables after the run.
    pub fn total(&self) -> u64 {
        self.for_sale + self.rentals + self.fred_metrics
    }
}

impl std::fmt::Display for PipelineResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "for_sale={} rentals={} fred_metrics={}",
            self.for_sale, self.rentals, self.fred_metrics
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_table_round_trip() {
        for table in Table::ALL {
            assert_eq!(table.as_str().parse::<Table>().unwrap(), table);
        }
    }

    #[test]
    fn test_unknown_table_rejected() {
        assert!("users; DROP TABLE users".parse::<Table>().is_err());
        assert!("".parse::<Table>().is_err());
        assert!("FOR_SALE_LISTINGS".parse::<Table>().is_err());
    }

    #[test]
    fn test_unique_keys() {
        assert_eq!(Table::ForSale.unique_key(), &["zpid"]);
        assert_eq!(Table::Rentals.unique_key(), &["zpid"]);
        assert_eq!(Table::FredMetrics.unique_key(), &["date", "series_id"]);
    }

    #[test]
    fn test_pipeline_result_total() {
        let result = PipelineResult {
            for_sale: 10,
            rentals: 20,
            fred_metrics: 300,
        };
        assert_eq!(result.total(), 330);
    }
}
