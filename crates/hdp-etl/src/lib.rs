//! HDP ETL Library
//!
//! Ingestion and reconciliation pipeline for the Housing Data Platform:
//! paginated listing fetch with retry/backoff, per-record validation,
//! multi-unit normalization, multi-series economic metrics, merge against
//! previously persisted state, and transactional SQLite persistence.
//!
//! # Example
//!
//! ```no_run
//! use hdp_etl::{config::EtlConfig, etl::EtlService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EtlConfig::load()?;
//!     let service = EtlService::from_config(config).await?;
//!     let result = service.run_full_refresh().await?;
//!     tracing::info!(%result, "refresh complete");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod etl;
pub mod fred;
pub mod reconcile;
pub mod records;
pub mod retry;
pub mod store;
pub mod units;
pub mod validate;
pub mod zillow;
