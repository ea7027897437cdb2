use crate::error::SessionError;
use crate::scrapers::traits::{PageElement, PageSession};
use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::browser::tab::NoElementFound;
use headless_chrome::protocol::cdp::DOM::NodeId;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Browser session backed by a single Chrome tab
pub struct ChromeSession {
    // Dropping the browser shuts Chrome down
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// Launch Chrome and open the tab all pages are loaded in
    pub fn launch(headless: bool, page_timeout: Duration) -> Result<Self> {
        info!("Launching Chrome (headless: {})...", headless);

        let options = LaunchOptions::default_builder()
            .headless(headless)
            .ignore_certificate_errors(true)
            .idle_browser_timeout(Duration::from_secs(15 * 60))
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;
        let tab = browser.new_tab().context("Failed to open browser tab")?;
        tab.set_default_timeout(page_timeout);

        Ok(Self {
            _browser: browser,
            tab,
        })
    }
}

/// A DOM node of the session's tab
pub struct ChromeElement {
    tab: Arc<Tab>,
    node_id: NodeId,
}

impl ChromeElement {
    fn wrap(tab: &Arc<Tab>, element: &Element<'_>) -> Self {
        Self {
            tab: Arc::clone(tab),
            node_id: element.node_id,
        }
    }

    fn resolve(&self) -> Result<Element<'_>, SessionError> {
        Element::new(&self.tab, self.node_id)
            .map_err(|e| SessionError::Interaction(format!("stale element: {}", e)))
    }

    fn with_element<T>(
        &self,
        f: impl FnOnce(&Element<'_>) -> anyhow::Result<T>,
    ) -> Result<T, SessionError> {
        let element = self.resolve()?;
        f(&element).map_err(|e| SessionError::Interaction(e.to_string()))
    }
}

fn query_error(selector: &str, err: anyhow::Error) -> SessionError {
    SessionError::Query {
        selector: selector.to_string(),
        reason: err.to_string(),
    }
}

fn not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<NoElementFound>().is_some()
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl PageElement for ChromeElement {
    fn find_one(&self, selector: &str) -> Result<Option<Self>, SessionError> {
        match self.resolve()?.find_element(selector) {
            Ok(child) => Ok(Some(Self::wrap(&self.tab, &child))),
            Err(err) if not_found(&err) => Ok(None),
            Err(err) => Err(query_error(selector, err)),
        }
    }

    fn find_all(&self, selector: &str) -> Result<Vec<Self>, SessionError> {
        match self.resolve()?.find_elements(selector) {
            Ok(children) => Ok(children
                .iter()
                .map(|child| Self::wrap(&self.tab, child))
                .collect()),
            Err(err) if not_found(&err) => Ok(Vec::new()),
            Err(err) => Err(query_error(selector, err)),
        }
    }

    fn text(&self) -> Result<String, SessionError> {
        self.with_element(|element| element.get_inner_text())
            .map(|text| collapse(&text))
    }

    fn attribute(&self, name: &str) -> Result<Option<String>, SessionError> {
        // Attributes come back as a flat [name, value, name, value, ...] list
        self.with_element(|element| element.get_attributes())
            .map(|attributes| {
                attributes.and_then(|flat| {
                    flat.chunks(2)
                        .find(|pair| pair[0] == name)
                        .and_then(|pair| pair.get(1).cloned())
                })
            })
    }
}

#[async_trait]
impl PageSession for ChromeSession {
    type Element = ChromeElement;

    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        debug!("Navigating to {}", url);
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map(|_| ())
            .map_err(|e| SessionError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    fn find_all(&self, selector: &str) -> Result<Vec<ChromeElement>, SessionError> {
        match self.tab.find_elements(selector) {
            Ok(elements) => Ok(elements
                .iter()
                .map(|element| ChromeElement::wrap(&self.tab, element))
                .collect()),
            Err(err) if not_found(&err) => Ok(Vec::new()),
            Err(err) => Err(query_error(selector, err)),
        }
    }

    fn find_one(&self, selector: &str) -> Result<Option<ChromeElement>, SessionError> {
        match self.tab.find_element(selector) {
            Ok(element) => Ok(Some(ChromeElement::wrap(&self.tab, &element))),
            Err(err) if not_found(&err) => Ok(None),
            Err(err) => Err(query_error(selector, err)),
        }
    }

    async fn click(&mut self, element: &ChromeElement) -> Result<(), SessionError> {
        element.with_element(|el| el.click().map(|_| ()))?;
        self.tab
            .wait_until_navigated()
            .map(|_| ())
            .map_err(|e| SessionError::Navigation {
                url: self.tab.get_url(),
                reason: e.to_string(),
            })
    }

    async fn settle(&self, pause: Duration) {
        tokio::time::sleep(pause).await;
    }

    fn backend_name(&self) -> &'static str {
        "chrome"
    }
}
