//! Turns the listing entries of one result page into observations.

use crate::error::{ListingParseError, SessionError};
use crate::models::Observation;
use crate::scrapers::fields::{self, PrimaryCriterion};
use crate::scrapers::traits::{PageElement, PageSession};
use chrono::NaiveDate;
use reqwest::Url;
use tracing::{debug, warn};

pub const LISTING_SELECTOR: &str = ".result-list__listing";
const TITLE_SELECTOR: &str = "h2.result-list-entry__brand-title";
const ADDRESS_SELECTOR: &str = "div.result-list-entry__address";
const EXPOSE_LINK_SELECTOR: &str = "div.result-list-entry__data a[href]";
const PRIMARY_CRITERION_SELECTOR: &str = "dl.result-list-entry__primary-criterion";
const SECONDARY_CRITERIA_SELECTOR: &str = "ul.result-list-entry__secondary-criteria";
const NEXT_PAGE_ITEM_SELECTOR: &str = "li.p-next";
const NEXT_PAGE_LINK_SELECTOR: &str = "a[aria-label='Next page']";

/// State of the result list's "next page" control
#[derive(Debug)]
pub enum NextPage<E> {
    Enabled(E),
    Disabled,
    Absent,
}

/// Listings extracted from one page plus the entries that were skipped
#[derive(Debug, Default)]
pub struct PageExtraction {
    pub observations: Vec<Observation>,
    pub failures: Vec<ListingParseError>,
}

/// Extracts observations dated to one run
pub struct PageExtractor {
    base_url: String,
    observed_on: NaiveDate,
}

impl PageExtractor {
    pub fn new(base_url: impl Into<String>, observed_on: NaiveDate) -> Self {
        Self {
            base_url: base_url.into(),
            observed_on,
        }
    }

    /// Extract every listing entry on the current page.
    ///
    /// A malformed entry is logged and skipped; only a failing page-level
    /// query is returned as an error.
    pub fn extract_page<S: PageSession>(&self, session: &S) -> Result<PageExtraction, SessionError> {
        let elements = session.find_all(LISTING_SELECTOR)?;
        debug!("Found {} listing entries", elements.len());

        let mut page = PageExtraction::default();
        for element in &elements {
            match self.extract_listing(element) {
                Ok(observation) => page.observations.push(observation),
                Err(err) => {
                    warn!(
                        listing_id = err.listing_id().unwrap_or("<unknown>"),
                        "Skipping listing: {}", err
                    );
                    page.failures.push(err);
                }
            }
        }
        Ok(page)
    }

    /// Build one observation from a listing entry; nothing partial is returned.
    pub fn extract_listing<E: PageElement>(&self, element: &E) -> Result<Observation, ListingParseError> {
        let listing_id = element
            .attribute("data-id")
            .map_err(|source| ListingParseError::Session {
                listing_id: None,
                source,
            })?
            .filter(|id| !id.trim().is_empty())
            .ok_or(ListingParseError::MissingId)?;
        let session_err = |source: SessionError| ListingParseError::Session {
            listing_id: Some(listing_id.clone()),
            source,
        };

        let title = required(element, TITLE_SELECTOR, "title", &listing_id)?
            .text()
            .map_err(session_err)?;
        let address = required(element, ADDRESS_SELECTOR, "address", &listing_id)?
            .text()
            .map_err(session_err)?;
        let href = required(element, EXPOSE_LINK_SELECTOR, "expose link", &listing_id)?
            .attribute("href")
            .map_err(session_err)?
            .ok_or_else(|| ListingParseError::MissingElement {
                listing_id: listing_id.clone(),
                what: "expose link",
            })?;

        let mut price = None;
        let mut living_space = None;
        let mut rooms = None;
        for criterion in element
            .find_all(PRIMARY_CRITERION_SELECTOR)
            .map_err(session_err)?
        {
            let label = required(&criterion, "dt", "criterion label", &listing_id)?
                .text()
                .map_err(session_err)?;
            let value = required(&criterion, "dd", "criterion value", &listing_id)?
                .text()
                .map_err(session_err)?;

            match fields::parse_criterion(&listing_id, &label, &value)? {
                Some(PrimaryCriterion::ColdRent(v)) => price = Some(v),
                Some(PrimaryCriterion::LivingSpace(v)) => living_space = Some(v),
                Some(PrimaryCriterion::Rooms(v)) => rooms = Some(v),
                None => {}
            }
        }
        let price = price.ok_or_else(|| ListingParseError::MissingElement {
            listing_id: listing_id.clone(),
            what: "cold rent",
        })?;

        let mut tags = Vec::new();
        if let Some(list) = element
            .find_one(SECONDARY_CRITERIA_SELECTOR)
            .map_err(session_err)?
        {
            for item in list.find_all("li").map_err(session_err)? {
                tags.push(item.text().map_err(session_err)?);
            }
        }

        Ok(Observation {
            url: resolve_url(&self.base_url, &href),
            title: fields::normalize_title(&title),
            address: fields::normalize_address(&address),
            price,
            living_space,
            rooms,
            secondary_criteria: fields::join_criteria(tags),
            observed_on: self.observed_on,
            listing_id,
        })
    }
}

/// Inspect the pagination control of the current page.
pub fn detect_next_page<S: PageSession>(session: &S) -> Result<NextPage<S::Element>, SessionError> {
    let Some(item) = session.find_one(NEXT_PAGE_ITEM_SELECTOR)? else {
        return Ok(NextPage::Absent);
    };

    let disabled = item
        .attribute("class")?
        .map(|class| class.split_whitespace().any(|c| c == "disabled"))
        .unwrap_or(false);
    if disabled {
        return Ok(NextPage::Disabled);
    }

    Ok(match item.find_one(NEXT_PAGE_LINK_SELECTOR)? {
        Some(link) => NextPage::Enabled(link),
        None => NextPage::Disabled,
    })
}

fn required<E: PageElement>(
    element: &E,
    selector: &str,
    what: &'static str,
    listing_id: &str,
) -> Result<E, ListingParseError> {
    element
        .find_one(selector)
        .map_err(|source| ListingParseError::Session {
            listing_id: Some(listing_id.to_string()),
            source,
        })?
        .ok_or_else(|| ListingParseError::MissingElement {
            listing_id: listing_id.to_string(),
            what,
        })
}

fn resolve_url(base_url: &str, href: &str) -> String {
    match Url::parse(base_url).and_then(|base| base.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}
