//! SQLite storage layer for Wardwatch.
//!
//! Only the raw counts of each [`ResourceRecord`] are stored. Occupancy,
//! utilization and alerts are derived on read by the metrics engine, so a
//! change to a formula or threshold applies to history immediately.

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

use crate::model::ResourceRecord;

/// Date format of the `date` column. Lexical order matches date order for
/// years 0000-9999, the only ones `parse_form` accepts.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Columns in insertion order, shared by every query.
const COLUMNS: &str = "date, total_beds, available_beds, icu_beds, available_icu_beds, \
     total_ventilators, available_ventilators, total_oxygen_cylinders, \
     available_oxygen_cylinders, total_doctors, available_doctors, total_nurses, \
     available_nurses, total_icu_nurses, available_icu_nurses";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Create a new storage instance and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:wardwatch.db" or "sqlite::memory:")
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Every connection to `:memory:` opens its own empty database.
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            5
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        let storage = Self { pool };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    /// Create the database schema if it doesn't exist.
    async fn initialize_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS hospital_resource_timeseries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                total_beds INTEGER NOT NULL,
                available_beds INTEGER NOT NULL,
                icu_beds INTEGER NOT NULL,
                available_icu_beds INTEGER NOT NULL,
                total_ventilators INTEGER NOT NULL,
                available_ventilators INTEGER NOT NULL,
                total_oxygen_cylinders INTEGER NOT NULL,
                available_oxygen_cylinders INTEGER NOT NULL,
                total_doctors INTEGER NOT NULL,
                available_doctors INTEGER NOT NULL,
                total_nurses INTEGER NOT NULL,
                available_nurses INTEGER NOT NULL,
                total_icu_nurses INTEGER NOT NULL,
                available_icu_nurses INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_hospital_resource_timeseries_date
            ON hospital_resource_timeseries(date)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a resource record.
    ///
    /// Several records may share a date; the most recently inserted one wins
    /// when reading the latest snapshot.
    pub async fn insert_record(&self, record: &ResourceRecord) -> anyhow::Result<()> {
        let sql = format!(
            "INSERT INTO hospital_resource_timeseries ({COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );

        sqlx::query(&sql)
            .bind(record.date.format(DATE_FORMAT).to_string())
            .bind(i64::from(record.total_beds))
            .bind(i64::from(record.available_beds))
            .bind(i64::from(record.icu_beds))
            .bind(i64::from(record.available_icu_beds))
            .bind(i64::from(record.total_ventilators))
            .bind(i64::from(record.available_ventilators))
            .bind(i64::from(record.total_oxygen_cylinders))
            .bind(i64::from(record.available_oxygen_cylinders))
            .bind(i64::from(record.total_doctors))
            .bind(i64::from(record.available_doctors))
            .bind(i64::from(record.total_nurses))
            .bind(i64::from(record.available_nurses))
            .bind(i64::from(record.total_icu_nurses))
            .bind(i64::from(record.available_icu_nurses))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Get the record with the latest reporting date.
    ///
    /// # Returns
    ///
    /// The latest record, or None if nothing has been reported yet.
    pub async fn latest_record(&self) -> anyhow::Result<Option<ResourceRecord>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM hospital_resource_timeseries \
             ORDER BY date DESC, id DESC LIMIT 1"
        );

        let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;

        row.as_ref().map(record_from_row).transpose()
    }

    /// Get every stored record, newest first.
    ///
    /// Ordered like [`latest_record`](Self::latest_record), so the first
    /// element is the latest record.
    pub async fn records_newest_first(&self) -> anyhow::Result<Vec<ResourceRecord>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM hospital_resource_timeseries \
             ORDER BY date DESC, id DESC"
        );

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(record_from_row).collect()
    }

    /// Get all records reported on or after `since`, oldest first.
    pub async fn records_since(&self, since: NaiveDate) -> anyhow::Result<Vec<ResourceRecord>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM hospital_resource_timeseries \
             WHERE date >= ? ORDER BY date ASC, id ASC"
        );

        let rows = sqlx::query(&sql)
            .bind(since.format(DATE_FORMAT).to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(record_from_row).collect()
    }
}

fn record_from_row(row: &SqliteRow) -> anyhow::Result<ResourceRecord> {
    let date: String = row.try_get("date")?;
    let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
        .with_context(|| format!("invalid stored date {date:?}"))?;

    Ok(ResourceRecord {
        date,
        total_beds: count(row, "total_beds")?,
        available_beds: count(row, "available_beds")?,
        icu_beds: count(row, "icu_beds")?,
        available_icu_beds: count(row, "available_icu_beds")?,
        total_ventilators: count(row, "total_ventilators")?,
        available_ventilators: count(row, "available_ventilators")?,
        total_oxygen_cylinders: count(row, "total_oxygen_cylinders")?,
        available_oxygen_cylinders: count(row, "available_oxygen_cylinders")?,
        total_doctors: count(row, "total_doctors")?,
        available_doctors: count(row, "available_doctors")?,
        total_nurses: count(row, "total_nurses")?,
        available_nurses: count(row, "available_nurses")?,
        total_icu_nurses: count(row, "total_icu_nurses")?,
        available_icu_nurses: count(row, "available_icu_nurses")?,
    })
}

fn count(row: &SqliteRow, column: &str) -> anyhow::Result<u32> {
    let value: i64 = row.try_get(column)?;
    u32::try_from(value).with_context(|| format!("stored {column} out of range: {value}"))
}
