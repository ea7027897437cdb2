use crate::models::Observation;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Search parameters for the rental result list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    /// Region path of the result list, e.g. `/Suche/de/baden-wuerttemberg/ulm/wohnung-mieten`
    pub region_path: String,
    /// Room count range, e.g. `2.0-3.5`
    pub rooms: Option<String>,
    /// Cold rent range, e.g. `-1000.0`
    pub price: Option<String>,
    /// Living space range, e.g. `50.0-`
    pub living_space: Option<String>,
}

impl SearchParams {
    /// Path plus query for the first result page.
    /// Without any range the broad region search is used.
    pub fn search_path(&self) -> String {
        let mut query = Vec::new();
        if let Some(rooms) = &self.rooms {
            query.push(format!("numberofrooms={}", rooms));
        }
        if let Some(price) = &self.price {
            query.push(format!("price={}", price));
        }
        if let Some(space) = &self.living_space {
            query.push(format!("livingspace={}", space));
        }

        if query.is_empty() {
            return self.region_path.clone();
        }
        query.push("pricetype=rentpermonth".to_string());
        query.push("enteredFrom=result_list".to_string());
        format!("{}?{}", self.region_path, query.join("&"))
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            region_path: "/Suche/de/baden-wuerttemberg/ulm/wohnung-mieten".to_string(),
            rooms: None,
            price: None,
            living_space: None,
        }
    }
}

/// Resolved settings of one pagination walk
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    pub base_url: String,
    pub search: SearchParams,
    /// Hard upper bound on pages visited in one run
    pub max_pages: u32,
    /// Pause after each page load
    pub settle: Duration,
    /// Extra attempts for a failed page load
    pub load_retries: u32,
}

impl WalkerConfig {
    pub fn start_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.search.search_path()
        )
    }
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.immobilienscout24.de".to_string(),
            search: SearchParams::default(),
            max_pages: 200,
            settle: Duration::from_secs(5),
            load_retries: 2,
        }
    }
}

/// Why a pagination walk stopped
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// The next page control was absent or disabled
    LastPage,
    /// The next page control could not be inspected
    NextPageUndetected { reason: String },
    /// The configured page cap was reached
    PageCap { max_pages: u32 },
    /// A "next" click left the result list unchanged
    Stalled { page: u32 },
    /// A page could not be loaded, even after retries
    PageLoadFailed { page: u32, reason: String },
    Cancelled,
}

impl Termination {
    pub fn is_failure(&self) -> bool {
        matches!(self, Termination::PageLoadFailed { .. })
    }
}

/// Outcome of one scrape run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_date: NaiveDate,
    pub pages_visited: u32,
    /// Every extracted observation, including ones already stored
    pub observations: Vec<Observation>,
    pub inserted: usize,
    pub already_present: usize,
    pub parse_failures: usize,
    pub store_failures: usize,
    pub termination: Termination,
}

impl RunReport {
    pub fn new(run_date: NaiveDate) -> Self {
        Self {
            run_date,
            pages_visited: 0,
            observations: Vec::new(),
            inserted: 0,
            already_present: 0,
            parse_failures: 0,
            store_failures: 0,
            termination: Termination::LastPage,
        }
    }
}
