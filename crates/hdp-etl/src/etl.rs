//! ETL orchestration
//!
//! Coordinates the three pipelines in a fixed sequence: for-sale listings,
//! rentals, FRED metrics. Credential validation happens once up front and is
//! fatal; a pipeline that fetched nothing is skipped (count 0, not an
//! error); any error escaping a step aborts the whole run.

use hdp_common::{HdpError, PipelineResult, Result, Table};
use tracing::{error, info, warn};

use crate::config::{EtlConfig, ListingFilters};
use crate::fred::FredClient;
use crate::reconcile::{merge_listings, merge_observations};
use crate::retry::RetryPolicy;
use crate::store::Store;
use crate::units::explode_units;
use crate::validate::{validate_listings, validate_observations};
use crate::zillow::{StatusType, ZillowClient};

/// Orchestrates pipeline execution and table updates.
pub struct EtlService {
    config: EtlConfig,
    zillow: ZillowClient,
    fred: FredClient,
    store: Store,
    retry: RetryPolicy,
}

impl EtlService {
    /// Build clients and connect the store from configuration.
    pub async fn from_config(config: EtlConfig) -> Result<Self> {
        let zillow = ZillowClient::new(
            config.rapid_api_key.clone(),
            config.zillow_host.clone(),
            config.http_timeout,
        )?;
        let fred = FredClient::new(
            config.fred_api_key.clone(),
            config.fred_base_url.clone(),
            config.http_timeout,
        )?;
        let store = Store::connect(&config.database_url, config.write_strategy).await?;

        Ok(Self::new(config, zillow, fred, store, RetryPolicy::default()))
    }

    /// Assemble from pre-built collaborators (used by tests to point the
    /// clients at mock servers).
    pub fn new(
        config: EtlConfig,
        zillow: ZillowClient,
        fred: FredClient,
        store: Store,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            config,
            zillow,
            fred,
            store,
            retry,
        }
    }

    /// Precondition check: every required credential present, or a fatal
    /// error naming all the missing ones.
    fn validate_credentials(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.config.rapid_api_key.is_empty() {
            missing.push("RAPID_API_KEY");
        }
        if self.config.fred_api_key.is_empty() {
            missing.push("FRED_API_KEY");
        }

        if missing.is_empty() {
            info!("All required credentials are set");
            Ok(())
        } else {
            Err(HdpError::MissingCredentials(missing.join(", ")))
        }
    }

    /// Fetch, normalize, validate, reconcile, and persist one listing
    /// category. Returns the row count of the updated table.
    async fn update_listings(
        &self,
        status: StatusType,
        table: Table,
        filters: &ListingFilters,
        multi_unit: bool,
    ) -> Result<u64> {
        info!(%status, %table, "Starting listings update");

        let batch = self
            .zillow
            .fetch_listings(status, &self.config.polygon, filters, &self.retry)
            .await;

        if batch.is_empty() {
            warn!(%table, "Skipping table update, no data available");
            return Ok(0);
        }

        let batch = if multi_unit { explode_units(batch) } else { batch };
        let fresh = validate_listings(batch, status.as_api_value())?;

        if fresh.is_empty() {
            warn!(%table, "Skipping table update, no records survived validation");
            return Ok(0);
        }

        let existing = self.store.read_listings(table).await?;
        if !existing.is_empty() {
            info!(%table, existing = existing.len(), "Merging with existing records");
        }
        let merged = merge_listings(existing, fresh);

        self.store.write_listings(table, &merged).await
    }

    /// Fetch, validate, reconcile, and persist the metric observations.
    async fn update_metrics(&self) -> Result<u64> {
        info!(table = %Table::FredMetrics, "Starting metrics update");

        let batch = self
            .fred
            .fetch_all(&self.config.fred_series, self.config.lookback_years, &self.retry)
            .await?;
        let fresh = validate_observations(batch.observations);

        if fresh.is_empty() {
            warn!(table = %Table::FredMetrics, "Skipping table update, no data available");
            return Ok(0);
        }

        let existing = self.store.read_observations().await?;
        if !existing.is_empty() {
            info!(table = %Table::FredMetrics, existing = existing.len(), "Merging with existing records");
        }
        let merged = merge_observations(existing, fresh);

        self.store.write_observations(&merged).await
    }

    /// Run all pipelines and update all tables.
    pub async fn run_full_refresh(&self) -> Result<PipelineResult> {
        info!("============================================================");
        info!("HDP ETL pipeline started");
        info!("============================================================");

        self.validate_credentials()?;

        let result = match self.run_pipelines().await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "ETL pipeline failed");
                return Err(e);
            },
        };

        info!("============================================================");
        info!(%result, "HDP ETL pipeline completed");
        info!("============================================================");

        Ok(result)
    }

    async fn run_pipelines(&self) -> Result<PipelineResult> {
        let for_sale = self
            .update_listings(
                StatusType::ForSale,
                Table::ForSale,
                &self.config.for_sale,
                false,
            )
            .await?;

        let rentals = self
            .update_listings(StatusType::ForRent, Table::Rentals, &self.config.rentals, true)
            .await?;

        let fred_metrics = self.update_metrics().await?;

        Ok(PipelineResult {
            for_sale,
            rentals,
            fred_metrics,
        })
    }
}
