use crate::models::{ListingHistory, ListingStatus};
use serde::Serialize;
use std::collections::BTreeSet;

/// Inclusive numeric bounds; an open side is `None`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Range {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Range {
    pub fn is_open(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// An unset range admits everything, including missing values
    fn admits(&self, value: Option<f64>) -> bool {
        if self.is_open() {
            return true;
        }
        let Some(value) = value else {
            return false;
        };
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// Row filter for the listing history
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub rooms: Range,
    pub living_space: Range,
    pub price: Range,
    /// Case-insensitive substring of the address
    pub address: Option<String>,
    /// Row matches when it carries any of these tags
    pub keywords: Vec<String>,
    pub status: Option<ListingStatus>,
}

impl HistoryFilter {
    pub fn matches(&self, row: &ListingHistory) -> bool {
        if !self.rooms.admits(row.rooms)
            || !self.living_space.admits(row.living_space)
            || !self.price.admits(Some(row.price))
        {
            return false;
        }

        if let Some(query) = &self.address {
            if !row.address.to_lowercase().contains(&query.to_lowercase()) {
                return false;
            }
        }

        if !self.keywords.is_empty() && !row.criteria().any(|tag| self.keywords.iter().any(|k| k == tag)) {
            return false;
        }

        self.status.map_or(true, |status| row.status == status)
    }

    pub fn apply<'a>(&self, rows: &'a [ListingHistory]) -> Vec<&'a ListingHistory> {
        rows.iter().filter(|row| self.matches(row)).collect()
    }
}

/// Aggregate figures over a set of listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub listed: usize,
    pub unlisted: usize,
    pub mean_price: Option<f64>,
    pub mean_living_space: Option<f64>,
    /// Mean price divided by mean living space
    pub mean_price_per_sqm: Option<f64>,
}

pub fn summarize(rows: &[&ListingHistory]) -> Summary {
    let listed = rows
        .iter()
        .filter(|row| row.status == ListingStatus::Listed)
        .count();
    let mean_price = mean(rows.iter().map(|row| row.price));
    let mean_living_space = mean(rows.iter().filter_map(|row| row.living_space));
    let mean_price_per_sqm = match (mean_price, mean_living_space) {
        (Some(price), Some(space)) if space > 0.0 => Some(price / space),
        _ => None,
    };

    Summary {
        count: rows.len(),
        listed,
        unlisted: rows.len() - listed,
        mean_price,
        mean_living_space,
        mean_price_per_sqm,
    }
}

/// Every secondary criteria tag present in `rows`, sorted
pub fn unique_keywords(rows: &[&ListingHistory]) -> BTreeSet<String> {
    rows.iter()
        .flat_map(|row| row.criteria())
        .map(str::to_string)
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(id: &str, price: f64, space: Option<f64>, criteria: &str, status: ListingStatus) -> ListingHistory {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        ListingHistory {
            listing_id: id.to_string(),
            title: format!("Wohnung {}", id),
            address: format!("Hauptstraße {}, 89073 Ulm", id),
            price,
            living_space: space,
            rooms: Some(2.0),
            secondary_criteria: criteria.to_string(),
            url: format!("https://example.test/expose/{}", id),
            listing_date: day,
            latest_date: day,
            status,
        }
    }

    fn sample() -> Vec<ListingHistory> {
        vec![
            row("1", 600.0, Some(40.0), "Balkon, Keller", ListingStatus::Listed),
            row("2", 900.0, Some(80.0), "Einbauküche", ListingStatus::Unlisted),
            row("3", 1200.0, None, "Balkon", ListingStatus::Listed),
        ]
    }

    #[test]
    fn default_filter_keeps_everything() {
        let rows = sample();
        assert_eq!(HistoryFilter::default().apply(&rows).len(), 3);
    }

    #[test]
    fn price_range_and_status() {
        let rows = sample();
        let filter = HistoryFilter {
            price: Range {
                min: Some(700.0),
                max: None,
            },
            status: Some(ListingStatus::Listed),
            ..HistoryFilter::default()
        };
        let ids: Vec<_> = filter.apply(&rows).iter().map(|r| r.listing_id.as_str()).collect();
        assert_eq!(ids, vec!["3"]);
    }

    #[test]
    fn set_range_excludes_missing_values() {
        let rows = sample();
        let filter = HistoryFilter {
            living_space: Range {
                min: Some(30.0),
                max: Some(100.0),
            },
            ..HistoryFilter::default()
        };
        assert_eq!(filter.apply(&rows).len(), 2);
    }

    #[test]
    fn keywords_match_any_and_address_ignores_case() {
        let rows = sample();
        let filter = HistoryFilter {
            keywords: vec!["Keller".to_string(), "Einbauküche".to_string()],
            ..HistoryFilter::default()
        };
        assert_eq!(filter.apply(&rows).len(), 2);

        let filter = HistoryFilter {
            address: Some("HAUPTSTRAßE 2".to_string()),
            ..HistoryFilter::default()
        };
        let matched = filter.apply(&rows);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].listing_id, "2");
    }

    #[test]
    fn summary_means() {
        let rows = sample();
        let all: Vec<_> = rows.iter().collect();
        let summary = summarize(&all);

        assert_eq!(summary.count, 3);
        assert_eq!(summary.listed, 2);
        assert_eq!(summary.unlisted, 1);
        assert_eq!(summary.mean_price, Some(900.0));
        assert_eq!(summary.mean_living_space, Some(60.0));
        assert_eq!(summary.mean_price_per_sqm, Some(15.0));
    }

    #[test]
    fn empty_summary_has_no_means() {
        let summary = summarize(&[]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.mean_price, None);
        assert_eq!(summary.mean_price_per_sqm, None);
    }

    #[test]
    fn keywords_are_unique_and_sorted() {
        let rows = sample();
        let all: Vec<_> = rows.iter().collect();
        let keywords: Vec<_> = unique_keywords(&all).into_iter().collect();
        assert_eq!(keywords, vec!["Balkon", "Einbauküche", "Keller"]);
    }
}
