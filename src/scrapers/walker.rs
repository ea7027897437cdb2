//! Drives a page session through every page of a search result set and
//! reconciles each page's listings with the store.

use crate::error::{ScrapeError, SessionError};
use crate::models::Observation;
use crate::scrapers::extractor::{detect_next_page, NextPage, PageExtractor};
use crate::scrapers::traits::{OperatorGate, PageSession};
use crate::scrapers::types::{RunReport, Termination, WalkerConfig};
use crate::store::{ListingStore, UpsertOutcome};
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

/// Walk states; `via` is the control to click, `None` for the start URL
enum WalkState<E> {
    Idle,
    FetchingPage { page: u32, via: Option<E> },
    AwaitingOperator,
    ExtractingListings { page: u32 },
    CheckingNextPage { page: u32 },
    Done(Termination),
}

pub struct PaginationWalker<'a, S, L: ?Sized> {
    session: &'a mut S,
    store: &'a L,
    gate: &'a dyn OperatorGate,
    config: WalkerConfig,
    cancel: CancellationToken,
}

impl<'a, S, L> PaginationWalker<'a, S, L>
where
    S: PageSession,
    L: ListingStore + ?Sized,
{
    pub fn new(
        session: &'a mut S,
        store: &'a L,
        gate: &'a dyn OperatorGate,
        config: WalkerConfig,
    ) -> Self {
        Self {
            session,
            store,
            gate,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the walk before the next page load once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Scrape every result page, recording observations dated `run_date`.
    ///
    /// Only an unusable store is an error; page-level failures end the walk
    /// and are reported in [`RunReport::termination`].
    pub async fn run(&mut self, run_date: NaiveDate) -> Result<RunReport, ScrapeError> {
        let span = info_span!(
            "scrape_run",
            %run_date,
            base_url = %self.config.base_url,
            backend = self.session.backend_name()
        );
        self.walk(run_date).instrument(span).await
    }

    async fn walk(&mut self, run_date: NaiveDate) -> Result<RunReport, ScrapeError> {
        self.store
            .create_schema_if_absent()
            .await
            .map_err(ScrapeError::StoreConnect)?;

        let extractor = PageExtractor::new(self.config.base_url.clone(), run_date);
        let mut report = RunReport::new(run_date);
        let mut previous_ids: Vec<String> = Vec::new();
        let mut state: WalkState<S::Element> = WalkState::Idle;

        loop {
            state = match state {
                WalkState::Idle => {
                    info!("Scrape started at {}", self.config.start_url());
                    WalkState::FetchingPage { page: 1, via: None }
                }

                WalkState::FetchingPage { page, via } => {
                    if self.cancel.is_cancelled() {
                        warn!("Scrape cancelled before page {}", page);
                        WalkState::Done(Termination::Cancelled)
                    } else if page > self.config.max_pages {
                        warn!("Stopping at page cap of {} pages", self.config.max_pages);
                        WalkState::Done(Termination::PageCap {
                            max_pages: self.config.max_pages,
                        })
                    } else {
                        match self.load(page, via.as_ref()).await {
                            Ok(()) => {
                                report.pages_visited = page;
                                if page == 1 {
                                    WalkState::AwaitingOperator
                                } else {
                                    WalkState::ExtractingListings { page }
                                }
                            }
                            Err(source) => {
                                let err = ScrapeError::PageLoad { page, source };
                                error!("{}", err);
                                WalkState::Done(Termination::PageLoadFailed {
                                    page,
                                    reason: err.to_string(),
                                })
                            }
                        }
                    }
                }

                WalkState::AwaitingOperator => {
                    tokio::select! {
                        _ = self.cancel.cancelled() => {
                            warn!("Scrape cancelled while waiting for the operator");
                            WalkState::Done(Termination::Cancelled)
                        }
                        ready = self.gate.wait_until_ready() => match ready {
                            Ok(()) => WalkState::ExtractingListings { page: 1 },
                            Err(e) => {
                                let err = ScrapeError::PageLoad {
                                    page: 1,
                                    source: SessionError::Interaction(format!(
                                        "operator gate: {:#}",
                                        e
                                    )),
                                };
                                error!("{}", err);
                                WalkState::Done(Termination::PageLoadFailed {
                                    page: 1,
                                    reason: err.to_string(),
                                })
                            }
                        },
                    }
                }

                WalkState::ExtractingListings { page } => {
                    match extractor.extract_page(&*self.session) {
                        Ok(extraction) => {
                            let ids: Vec<String> = extraction
                                .observations
                                .iter()
                                .map(|o| o.listing_id.clone())
                                .collect();

                            if page > 1 && !ids.is_empty() && ids == previous_ids {
                                warn!("Page {} repeats the previous page, stopping", page);
                                WalkState::Done(Termination::Stalled { page })
                            } else {
                                info!(
                                    "Page {}: {} listings, {} skipped",
                                    page,
                                    extraction.observations.len(),
                                    extraction.failures.len()
                                );
                                report.parse_failures += extraction.failures.len();
                                self.reconcile(extraction.observations, &mut report).await;
                                previous_ids = ids;
                                WalkState::CheckingNextPage { page }
                            }
                        }
                        Err(source) => {
                            let err = ScrapeError::PageLoad { page, source };
                            error!("{}", err);
                            WalkState::Done(Termination::PageLoadFailed {
                                page,
                                reason: err.to_string(),
                            })
                        }
                    }
                }

                WalkState::CheckingNextPage { page } => match detect_next_page(&*self.session) {
                    Ok(NextPage::Enabled(link)) => WalkState::FetchingPage {
                        page: page + 1,
                        via: Some(link),
                    },
                    Ok(NextPage::Disabled) | Ok(NextPage::Absent) => {
                        info!("No further result pages after page {}", page);
                        WalkState::Done(Termination::LastPage)
                    }
                    Err(source) => {
                        let err = ScrapeError::PaginationDetection(source);
                        error!("Pagination error: {}", err);
                        WalkState::Done(Termination::NextPageUndetected {
                            reason: err.to_string(),
                        })
                    }
                },

                WalkState::Done(termination) => {
                    report.termination = termination;
                    break;
                }
            };
        }

        info!(
            "Scrape ended: {} pages, {} listings ({} new, {} known), {} skipped",
            report.pages_visited,
            report.observations.len(),
            report.inserted,
            report.already_present,
            report.parse_failures
        );
        if report.store_failures > 0 {
            warn!(
                "{} listings could not be written to the store",
                report.store_failures
            );
        }

        Ok(report)
    }

    /// Load `page` with bounded retries, then let it settle.
    async fn load(&mut self, page: u32, via: Option<&S::Element>) -> Result<(), SessionError> {
        let url = self.config.start_url();
        let mut attempt = 0;

        loop {
            let result = match via {
                None => self.session.navigate(&url).await,
                Some(link) => self.session.click(link).await,
            };
            match result {
                Ok(()) => break,
                Err(err) if attempt < self.config.load_retries => {
                    attempt += 1;
                    warn!(page, attempt, "Page load failed, retrying: {}", err);
                    self.session.settle(self.config.settle).await;
                }
                Err(err) => return Err(err),
            }
        }
        self.session.settle(self.config.settle).await;
        Ok(())
    }

    /// Insert every observation not yet stored for its date
    async fn reconcile(&self, observations: Vec<Observation>, report: &mut RunReport) {
        for observation in observations {
            let stored = match self
                .store
                .exists(&observation.listing_id, observation.observed_on)
                .await
            {
                Ok(true) => Ok(UpsertOutcome::AlreadyPresent),
                Ok(false) => self.store.upsert(&observation).await,
                Err(err) => Err(err),
            };

            match stored {
                Ok(UpsertOutcome::Inserted) => report.inserted += 1,
                Ok(UpsertOutcome::AlreadyPresent) => report.already_present += 1,
                Err(err) => {
                    report.store_failures += 1;
                    error!(listing_id = %observation.listing_id, "Store error: {}", err);
                }
            }
            report.observations.push(observation);
        }
    }
}
