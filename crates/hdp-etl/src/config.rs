//! Configuration management
//!
//! All settings load from environment variables (with `.env` support via
//! dotenvy) on top of defaults tuned for the Nashville metro deployment.

use std::collections::BTreeMap;
use std::time::Duration;

use hdp_common::{HdpError, Result};

use crate::store::WriteStrategy;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default database URL; `mode=rwc` creates the file on first run.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:hdp.db?mode=rwc";

/// Default page cap per listing fetch.
pub const DEFAULT_MAX_PAGES: u32 = 20;

/// Default courtesy delay between listing page requests, in milliseconds.
pub const DEFAULT_PAGE_DELAY_MS: u64 = 500;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default historical lookback for economic series, in years.
pub const DEFAULT_LOOKBACK_YEARS: u32 = 15;

/// Default listings API host (RapidAPI gateway).
pub const DEFAULT_ZILLOW_HOST: &str = "zillow-com1.p.rapidapi.com";

/// Default FRED API base URL.
pub const DEFAULT_FRED_BASE_URL: &str = "https://api.stlouisfed.org";

/// Bounding box for the Nashville, TN metropolitan area.
pub const NASHVILLE_POLYGON: Polygon = Polygon {
    west: -87.2316,
    north: 36.5227,
    east: -86.3316,
    south: 35.8027,
};

/// Rectangular geographic boundary for listing queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polygon {
    pub west: f64,
    pub north: f64,
    pub east: f64,
    pub south: f64,
}

impl Polygon {
    /// Closed-ring polygon string in the listings API's "lon lat, ..." format.
    pub fn to_query_string(&self) -> String {
        format!(
            "{w} {n}, {e} {n}, {e} {s}, {w} {s}, {w} {n}",
            w = self.west,
            n = self.north,
            e = self.east,
            s = self.south
        )
    }
}

/// Numeric search filters for one listing category.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingFilters {
    pub min_price: u64,
    pub max_price: u64,
    pub beds_min: u32,
    pub beds_max: u32,
    pub baths_min: u32,
    pub baths_max: u32,
    pub sqft_min: u32,
    pub sqft_max: u32,
    pub build_year_min: u32,
    /// Hard cap on pages fetched per run
    pub max_pages: u32,
    /// Courtesy delay between page requests
    pub page_delay: Duration,
}

impl ListingFilters {
    /// Filters used for the for-sale category.
    pub fn for_sale_defaults() -> Self {
        Self {
            min_price: 100_000,
            max_price: 700_000,
            beds_min: 1,
            beds_max: 5,
            baths_min: 1,
            baths_max: 4,
            sqft_min: 700,
            sqft_max: 5_000,
            build_year_min: 1990,
            max_pages: DEFAULT_MAX_PAGES,
            page_delay: Duration::from_millis(DEFAULT_PAGE_DELAY_MS),
        }
    }

    /// Filters used for the rental category.
    pub fn rental_defaults() -> Self {
        Self {
            min_price: 1_400,
            max_price: 3_200,
            beds_min: 1,
            beds_max: 4,
            baths_min: 1,
            baths_max: 4,
            sqft_min: 550,
            sqft_max: 6_000,
            build_year_min: 1979,
            max_pages: DEFAULT_MAX_PAGES,
            page_delay: Duration::from_millis(DEFAULT_PAGE_DELAY_MS),
        }
    }

    /// Query parameters as (name, value) pairs, excluding polygon/status/page.
    pub fn to_query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("minPrice", self.min_price.to_string()),
            ("maxPrice", self.max_price.to_string()),
            ("bedsMin", self.beds_min.to_string()),
            ("bedsMax", self.beds_max.to_string()),
            ("bathsMin", self.baths_min.to_string()),
            ("bathsMax", self.baths_max.to_string()),
            ("sqftMin", self.sqft_min.to_string()),
            ("sqftMax", self.sqft_max.to_string()),
            ("buildYearMin", self.build_year_min.to_string()),
        ]
    }
}

/// FRED series configuration: metric name -> series identifier.
///
/// One series maps 1:1 to one metric name; the map is ordered so fetch order
/// (and therefore logging) is stable across runs.
pub fn default_fred_series() -> BTreeMap<String, String> {
    [
        ("active_listings", "ACTLISCOU34980"),
        ("median_price", "MEDLISPRI34980"),
        ("median_dom", "MEDDAYONMAR34980"),
        ("employment_non_farm", "NASH947NA"),
        ("msa_population", "NVLPOP"),
        ("median_pp_sqft", "MEDLISPRIPERSQUFEE34980"),
        ("median_listing_price_change", "MEDLISPRIMM47037"),
        ("msa_per_capita_income", "NASH947PCPI"),
    ]
    .into_iter()
    .map(|(name, id)| (name.to_string(), id.to_string()))
    .collect()
}

/// Full pipeline configuration.
#[derive(Debug, Clone)]
pub struct EtlConfig {
    /// RapidAPI key for the listings API (may be empty; the orchestrator
    /// validates presence before any fetch)
    pub rapid_api_key: String,
    /// FRED API key (same validation rule)
    pub fred_api_key: String,
    pub database_url: String,
    pub zillow_host: String,
    pub fred_base_url: String,
    pub http_timeout: Duration,
    pub polygon: Polygon,
    pub for_sale: ListingFilters,
    pub rentals: ListingFilters,
    pub fred_series: BTreeMap<String, String>,
    pub lookback_years: u32,
    pub write_strategy: WriteStrategy,
}

impl EtlConfig {
    /// Load configuration from environment and defaults.
    ///
    /// Environment variables:
    /// - `RAPID_API_KEY`: listings API key
    /// - `FRED_API_KEY`: FRED API key
    /// - `HDP_DATABASE_URL`: sqlite connection string
    /// - `HDP_MAX_PAGES`: page cap override for both listing categories
    /// - `HDP_LOOKBACK_YEARS`: metrics lookback override
    /// - `HDP_WRITE_STRATEGY`: `replace` (default) or `upsert`
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut for_sale = ListingFilters::for_sale_defaults();
        let mut rentals = ListingFilters::rental_defaults();

        if let Ok(pages) = std::env::var("HDP_MAX_PAGES") {
            let pages: u32 = pages
                .parse()
                .map_err(|_| HdpError::Config(format!("invalid HDP_MAX_PAGES: {pages}")))?;
            for_sale.max_pages = pages;
            rentals.max_pages = pages;
        }

        let lookback_years = match std::env::var("HDP_LOOKBACK_YEARS") {
            Ok(years) => years
                .parse()
                .map_err(|_| HdpError::Config(format!("invalid HDP_LOOKBACK_YEARS: {years}")))?,
            Err(_) => DEFAULT_LOOKBACK_YEARS,
        };

        let write_strategy = match std::env::var("HDP_WRITE_STRATEGY") {
            Ok(s) => s.parse()?,
            Err(_) => WriteStrategy::Replace,
        };

        Ok(Self {
            rapid_api_key: std::env::var("RAPID_API_KEY").unwrap_or_default(),
            fred_api_key: std::env::var("FRED_API_KEY").unwrap_or_default(),
            database_url: std::env::var("HDP_DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            zillow_host: DEFAULT_ZILLOW_HOST.to_string(),
            fred_base_url: DEFAULT_FRED_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            polygon: NASHVILLE_POLYGON,
            for_sale,
            rentals,
            fred_series: default_fred_series(),
            lookback_years,
            write_strategy,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_query_string_closes_the_ring() {
        let s = NASHVILLE_POLYGON.to_query_string();
        let corners: Vec<&str> = s.split(", ").collect();
        assert_eq!(corners.len(), 5);
        // First and last corners are identical (closed ring)
        assert_eq!(corners[0], corners[4]);
        assert_eq!(corners[0], "-87.2316 36.5227");
    }

    #[test]
    fn test_filter_query_params() {
        let params = ListingFilters::for_sale_defaults().to_query_params();
        let min_price = params.iter().find(|(k, _)| *k == "minPrice").unwrap();
        assert_eq!(min_price.1, "100000");
        assert!(params.iter().all(|(k, _)| *k != "page"));
    }

    #[test]
    fn test_default_series_map() {
        let series = default_fred_series();
        assert_eq!(series.len(), 8);
        assert_eq!(series["median_price"], "MEDLISPRI34980");
        // Month-over-month change is a distinct series, not the level series
        assert_eq!(series["median_listing_price_change"], "MEDLISPRIMM47037");
    }
}
