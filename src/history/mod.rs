//! Read side: folds the observation history into one row per listing.

pub mod analytics;

use crate::error::StoreError;
use crate::models::{ListingHistory, ListingStatus, Observation};
use crate::store::ListingStore;
use chrono::{Local, NaiveDate};
use std::collections::HashMap;
use tracing::debug;

/// Reduce observations to first/last-seen rows.
///
/// `today` is fixed for the whole reduction so every row is judged
/// against the same date. Output order is unspecified.
pub fn reduce(observations: &[Observation], today: NaiveDate) -> Vec<ListingHistory> {
    let mut spans: HashMap<&str, (&Observation, NaiveDate)> = HashMap::new();

    for obs in observations {
        spans
            .entry(obs.listing_id.as_str())
            .and_modify(|(first, latest)| {
                if obs.observed_on < first.observed_on {
                    *first = obs;
                }
                if obs.observed_on > *latest {
                    *latest = obs.observed_on;
                }
            })
            .or_insert((obs, obs.observed_on));
    }

    spans
        .into_values()
        .map(|(first, latest_date)| ListingHistory {
            listing_id: first.listing_id.clone(),
            title: first.title.clone(),
            address: first.address.clone(),
            price: first.price,
            living_space: first.living_space,
            rooms: first.rooms,
            secondary_criteria: first.secondary_criteria.clone(),
            url: first.url.clone(),
            listing_date: first.observed_on,
            latest_date,
            status: if latest_date == today {
                ListingStatus::Listed
            } else {
                ListingStatus::Unlisted
            },
        })
        .collect()
}

/// Load every observation from `store` and reduce it against the local date.
pub async fn load_history<S: ListingStore + ?Sized>(store: &S) -> Result<Vec<ListingHistory>, StoreError> {
    let observations = store.read_all().await?;
    let today = Local::now().date_naive();
    let rows = reduce(&observations, today);
    debug!(
        "Reduced {} observations to {} listings (today = {})",
        observations.len(),
        rows.len(),
        today
    );
    Ok(rows)
}
