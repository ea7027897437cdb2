pub mod sqlite;

pub use sqlite::SqliteListingStore;

use crate::error::StoreError;
use crate::models::Observation;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Result of inserting one observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// A row for the same listing and date already existed; nothing was changed
    AlreadyPresent,
}

/// Durable observation storage keyed by `(listing_id, observed_on)`.
///
/// Inserts never update: a conflicting key is a no-op.
#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn create_schema_if_absent(&self) -> Result<(), StoreError>;

    async fn exists(&self, listing_id: &str, observed_on: NaiveDate) -> Result<bool, StoreError>;

    async fn upsert(&self, observation: &Observation) -> Result<UpsertOutcome, StoreError>;

    /// Every stored observation ordered by listing id, then date
    async fn read_all(&self) -> Result<Vec<Observation>, StoreError>;
}
