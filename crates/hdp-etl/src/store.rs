//! Persistence gateway
//!
//! One bounded, transactional write per pipeline run. Table names only ever
//! come from the [`Table`] whitelist enum, so SQL is built exclusively from
//! static strings; a name that fails `Table::from_str` is rejected before
//! any query exists. Nested field values live JSON-serialized in the `data`
//! column since the store is relational.
//!
//! Two interchangeable write strategies sit behind the same interface:
//! whole-table replace (for stores without native upsert, and the default to
//! match historical behavior) and a keyed upsert naming the unique-key
//! columns as conflict target.

use chrono::Utc;
use hdp_common::{HdpError, Result, Table};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::{debug, info};

use crate::records::{Listing, Observation};

/// How merged rows are written to a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteStrategy {
    /// Delete everything, insert the merged set. Works on any store.
    #[default]
    Replace,
    /// `INSERT .. ON CONFLICT(key) DO UPDATE`. Requires native upsert.
    Upsert,
}

impl std::str::FromStr for WriteStrategy {
    type Err = HdpError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "replace" => Ok(WriteStrategy::Replace),
            "upsert" => Ok(WriteStrategy::Upsert),
            other => Err(HdpError::Config(format!("invalid write strategy: {other}"))),
        }
    }
}

/// Gateway to the persistent store.
pub struct Store {
    pool: SqlitePool,
    strategy: WriteStrategy,
}

impl Store {
    /// Connect and make sure the schema exists.
    pub async fn connect(database_url: &str, strategy: WriteStrategy) -> Result<Self> {
        // Writes are never concurrent in this pipeline; a single connection
        // also keeps in-memory databases coherent.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;

        let store = Self { pool, strategy };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Wrap an existing pool (tests).
    pub async fn with_pool(pool: SqlitePool, strategy: WriteStrategy) -> Result<Self> {
        let store = Self { pool, strategy };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        for table in [Table::ForSale, Table::Rentals] {
            let sql = format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    zpid TEXT PRIMARY KEY,
                    price REAL,
                    data TEXT NOT NULL,
                    fetched_at TEXT NOT NULL
                )",
                table.as_str()
            );
            sqlx::query(&sql).execute(&self.pool).await?;
        }

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS fred_metrics (
                date TEXT NOT NULL,
                series_id TEXT NOT NULL,
                metric_name TEXT NOT NULL,
                value REAL NOT NULL,
                PRIMARY KEY (date, series_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn listing_table(table: Table) -> Result<Table> {
        match table {
            Table::ForSale | Table::Rentals => Ok(table),
            Table::FredMetrics => Err(HdpError::UnknownTable(format!(
                "{table} (expected a listing table)"
            ))),
        }
    }

    /// Read all previously persisted listings; a table that does not exist
    /// yet reads as empty (first run).
    pub async fn read_listings(&self, table: Table) -> Result<Vec<Listing>> {
        let table = Self::listing_table(table)?;
        let sql = format!("SELECT data FROM {}", table.as_str());

        let rows = match sqlx::query(&sql).fetch_all(&self.pool).await {
            Ok(rows) => rows,
            Err(e) if is_missing_table(&e) => {
                info!(%table, "Table does not exist yet, reading as empty");
                return Ok(Vec::new());
            },
            Err(e) => return Err(e.into()),
        };

        let mut listings = Vec::with_capacity(rows.len());
        for row in rows {
            let data: String = row.try_get("data")?;
            listings.push(serde_json::from_str(&data)?);
        }

        debug!(%table, count = listings.len(), "Read persisted listings");
        Ok(listings)
    }

    /// Read all previously persisted observations.
    pub async fn read_observations(&self) -> Result<Vec<Observation>> {
        let rows = match sqlx::query("SELECT date, series_id, metric_name, value FROM fred_metrics")
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => rows,
            Err(e) if is_missing_table(&e) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut observations = Vec::with_capacity(rows.len());
        for row in rows {
            let date: String = row.try_get("date")?;
            let date = date
                .parse()
                .map_err(|_| HdpError::Decode(format!("invalid persisted date: {date}")))?;
            observations.push(Observation {
                date,
                series_id: row.try_get("series_id")?,
                metric_name: row.try_get("metric_name")?,
                value: row.try_get("value")?,
            });
        }

        Ok(observations)
    }

    /// Atomically write the merged listing set.
    ///
    /// One transaction per call; any failure drops the transaction, which
    /// rolls it back, and the error propagates to the orchestrator.
    pub async fn write_listings(&self, table: Table, rows: &[Listing]) -> Result<u64> {
        let table = Self::listing_table(table)?;
        let fetched_at = Utc::now().to_rfc3339();

        let insert_sql = match self.strategy {
            WriteStrategy::Replace => format!(
                "INSERT INTO {} (zpid, price, data, fetched_at) VALUES (?, ?, ?, ?)",
                table.as_str()
            ),
            WriteStrategy::Upsert => format!(
                "INSERT INTO {} (zpid, price, data, fetched_at) VALUES (?, ?, ?, ?)
                 ON CONFLICT(zpid) DO UPDATE SET
                     price = excluded.price,
                     data = excluded.data,
                     fetched_at = excluded.fetched_at",
                table.as_str()
            ),
        };

        let mut tx = self.pool.begin().await?;

        if self.strategy == WriteStrategy::Replace {
            let delete_sql = format!("DELETE FROM {}", table.as_str());
            sqlx::query(&delete_sql).execute(&mut *tx).await?;
        }

        for listing in rows {
            let key = listing.key().ok_or_else(|| {
                HdpError::DataValidation("keyless record reached the store".to_string())
            })?;
            sqlx::query(&insert_sql)
                .bind(&key)
                .bind(listing.price())
                .bind(serde_json::to_string(listing)?)
                .bind(&fetched_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!(%table, count = rows.len(), "Table updated");
        Ok(rows.len() as u64)
    }

    /// Atomically write the merged observation set.
    pub async fn write_observations(&self, rows: &[Observation]) -> Result<u64> {
        let insert_sql = match self.strategy {
            WriteStrategy::Replace => {
                "INSERT INTO fred_metrics (date, series_id, metric_name, value)
                 VALUES (?, ?, ?, ?)"
            },
            WriteStrategy::Upsert => {
                "INSERT INTO fred_metrics (date, series_id, metric_name, value)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT(date, series_id) DO UPDATE SET
                     metric_name = excluded.metric_name,
                     value = excluded.value"
            },
        };

        let mut tx = self.pool.begin().await?;

        if self.strategy == WriteStrategy::Replace {
            sqlx::query("DELETE FROM fred_metrics").execute(&mut *tx).await?;
        }

        for obs in rows {
            sqlx::query(insert_sql)
                .bind(obs.date.to_string())
                .bind(&obs.series_id)
                .bind(&obs.metric_name)
                .bind(obs.value)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!(table = %Table::FredMetrics, count = rows.len(), "Table updated");
        Ok(rows.len() as u64)
    }
}

fn is_missing_table(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.message().contains("no such table"))
}
