//! Typed errors for the scraping pipeline and the listing store.

use thiserror::Error;

/// Failures reported by a browser or HTTP page session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    #[error("element query `{selector}` failed: {reason}")]
    Query { selector: String, reason: String },

    #[error("element interaction failed: {0}")]
    Interaction(String),
}

/// A primary criterion value that could not be parsed as a number.
#[derive(Debug, Error, PartialEq)]
#[error("listing {listing_id}: cannot parse {label:?} value {value:?}")]
pub struct FieldError {
    pub listing_id: String,
    pub label: String,
    pub value: String,
}

/// A listing element that had to be skipped.
#[derive(Debug, Error)]
pub enum ListingParseError {
    #[error("listing element has no data-id attribute")]
    MissingId,

    #[error("listing {listing_id}: missing {what}")]
    MissingElement {
        listing_id: String,
        what: &'static str,
    },

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("listing {listing_id:?}: {source}")]
    Session {
        listing_id: Option<String>,
        #[source]
        source: SessionError,
    },
}

impl ListingParseError {
    pub fn listing_id(&self) -> Option<&str> {
        match self {
            ListingParseError::MissingId => None,
            ListingParseError::MissingElement { listing_id, .. } => Some(listing_id),
            ListingParseError::Field(err) => Some(&err.listing_id),
            ListingParseError::Session { listing_id, .. } => listing_id.as_deref(),
        }
    }
}

/// Errors from the durable listing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot connect to listing store: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("cannot create listing schema: {0}")]
    Schema(#[source] sqlx::Error),

    #[error("cannot write listing {listing_id}: {source}")]
    Write {
        listing_id: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("cannot read listings: {0}")]
    Read(#[source] sqlx::Error),
}

/// Run-level failures of the pagination walk.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("page {page} failed to load: {source}")]
    PageLoad {
        page: u32,
        #[source]
        source: SessionError,
    },

    #[error("next page control could not be inspected: {0}")]
    PaginationDetection(#[source] SessionError),

    #[error("listing store unavailable: {0}")]
    StoreConnect(#[source] StoreError),
}
