use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One sighting of a listing on a given run date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub listing_id: String,
    pub title: String,
    pub address: String,
    /// Cold rent in euros
    pub price: f64,
    /// Living space in square meters
    pub living_space: Option<f64>,
    pub rooms: Option<f64>,
    /// Secondary criteria tags joined with `", "`
    pub secondary_criteria: String,
    pub observed_on: NaiveDate,
    pub url: String,
}

/// Whether a listing was seen in the most recent run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Listed,
    Unlisted,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Listed => "listed",
            ListingStatus::Unlisted => "unlisted",
        }
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// First/last-seen summary of one listing, derived from its observations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingHistory {
    pub listing_id: String,
    pub title: String,
    pub address: String,
    pub price: f64,
    pub living_space: Option<f64>,
    pub rooms: Option<f64>,
    pub secondary_criteria: String,
    pub url: String,
    pub listing_date: NaiveDate,
    pub latest_date: NaiveDate,
    pub status: ListingStatus,
}

impl ListingHistory {
    /// Secondary criteria split back into individual tags
    pub fn criteria(&self) -> impl Iterator<Item = &str> {
        self.secondary_criteria
            .split(", ")
            .filter(|tag| !tag.is_empty())
    }
}
