//! SQLite-backed listing store.
//!
//! The pool holds a single connection: writes are serialized, and an
//! in-memory database lives exactly as long as the store.

use crate::error::StoreError;
use crate::models::Observation;
use crate::store::{ListingStore, UpsertOutcome};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tracing::debug;

pub struct SqliteListingStore {
    pool: SqlitePool,
}

impl SqliteListingStore {
    /// Open a store at `database_url`.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - In-memory database (ephemeral)
    /// - `sqlite://listings.db?mode=rwc` - File database, created if missing
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(database_url)
            .await
            .map_err(StoreError::Connect)?;

        debug!("Connected to listing store at {}", database_url);
        Ok(Self { pool })
    }

    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:").await
    }

    /// Release the connection
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[derive(Debug, FromRow)]
struct ListingRow {
    data_id: String,
    title: String,
    address: String,
    kaltmiete: f64,
    living_space: Option<f64>,
    rooms: Option<f64>,
    secondary_criteria: String,
    date: NaiveDate,
    expose_url: String,
}

impl From<ListingRow> for Observation {
    fn from(row: ListingRow) -> Self {
        Observation {
            listing_id: row.data_id,
            title: row.title,
            address: row.address,
            price: row.kaltmiete,
            living_space: row.living_space,
            rooms: row.rooms,
            secondary_criteria: row.secondary_criteria,
            observed_on: row.date,
            url: row.expose_url,
        }
    }
}

#[async_trait]
impl ListingStore for SqliteListingStore {
    async fn create_schema_if_absent(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS listings (
                data_id TEXT NOT NULL,
                title TEXT NOT NULL,
                address TEXT NOT NULL,
                kaltmiete REAL NOT NULL,
                living_space REAL,
                rooms REAL,
                secondary_criteria TEXT NOT NULL DEFAULT '',
                date TEXT NOT NULL,
                expose_url TEXT NOT NULL,
                PRIMARY KEY (data_id, date)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::Schema)?;

        Ok(())
    }

    async fn exists(&self, listing_id: &str, observed_on: NaiveDate) -> Result<bool, StoreError> {
        let found: Option<(String,)> =
            sqlx::query_as("SELECT data_id FROM listings WHERE data_id = ? AND date = ?")
                .bind(listing_id)
                .bind(observed_on)
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::Read)?;

        Ok(found.is_some())
    }

    async fn upsert(&self, observation: &Observation) -> Result<UpsertOutcome, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO listings (
                data_id, title, address, kaltmiete, living_space, rooms,
                secondary_criteria, date, expose_url
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (data_id, date) DO NOTHING
            "#,
        )
        .bind(&observation.listing_id)
        .bind(&observation.title)
        .bind(&observation.address)
        .bind(observation.price)
        .bind(observation.living_space)
        .bind(observation.rooms)
        .bind(&observation.secondary_criteria)
        .bind(observation.observed_on)
        .bind(&observation.url)
        .execute(&self.pool)
        .await
        .map_err(|source| StoreError::Write {
            listing_id: observation.listing_id.clone(),
            source,
        })?;

        Ok(if result.rows_affected() == 0 {
            UpsertOutcome::AlreadyPresent
        } else {
            UpsertOutcome::Inserted
        })
    }

    async fn read_all(&self) -> Result<Vec<Observation>, StoreError> {
        let rows: Vec<ListingRow> = sqlx::query_as(
            r#"
            SELECT data_id, title, address, kaltmiete, living_space, rooms,
                   secondary_criteria, date, expose_url
            FROM listings
            ORDER BY data_id, date
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Read)?;

        Ok(rows.into_iter().map(Observation::from).collect())
    }
}
