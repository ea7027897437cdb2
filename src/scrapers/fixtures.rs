//! Result page markup and a scripted session for exercising the scrape
//! pipeline without a browser.

use crate::error::SessionError;
use crate::scrapers::dom::{HtmlDocument, HtmlElement};
use crate::scrapers::traits::PageSession;
use async_trait::async_trait;
use std::time::Duration;

pub struct ListingFixture {
    pub id: String,
    pub title: String,
    pub address: String,
    pub price_label: String,
    pub price: String,
    pub living_space: Option<String>,
    pub rooms: Option<String>,
    pub criteria: Vec<String>,
}

impl ListingFixture {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: format!("Wohnung {}", id),
            address: "Hauptstraße 1,\n   89073 Ulm".to_string(),
            price_label: "Kaltmiete".to_string(),
            price: "850 €".to_string(),
            living_space: Some("60 m²".to_string()),
            rooms: Some("2".to_string()),
            criteria: vec!["Balkon/Terrasse".to_string(), "Einbauküche".to_string()],
        }
    }

    fn html(&self) -> String {
        let mut criteria = format!(
            r#"<dl class="result-list-entry__primary-criterion"><dd>{}</dd><dt>{}</dt></dl>"#,
            self.price, self.price_label
        );
        if let Some(space) = &self.living_space {
            criteria.push_str(&format!(
                r#"<dl class="result-list-entry__primary-criterion"><dd>{}</dd><dt>Wohnfläche</dt></dl>"#,
                space
            ));
        }
        if let Some(rooms) = &self.rooms {
            criteria.push_str(&format!(
                r#"<dl class="result-list-entry__primary-criterion"><dd>{}</dd><dt>Zi.</dt></dl>"#,
                rooms
            ));
        }
        let secondary: String = self
            .criteria
            .iter()
            .map(|c| format!("<li>{}</li>", c))
            .collect();

        format!(
            r#"<li class="result-list__listing" data-id="{id}">
                 <h2 class="result-list-entry__brand-title">{title}</h2>
                 <div class="result-list-entry__address">{address}</div>
                 <div class="result-list-entry__data">
                   <a href="/expose/{id}">Exposé</a>
                   {criteria}
                 </div>
                 <ul class="result-list-entry__secondary-criteria">{secondary}</ul>
               </li>"#,
            id = self.id,
            title = self.title,
            address = self.address,
            criteria = criteria,
            secondary = secondary,
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub enum NextControl {
    Enabled,
    Disabled,
    Absent,
}

pub fn result_page(listings: &[ListingFixture], next: NextControl) -> String {
    let entries: String = listings.iter().map(ListingFixture::html).collect();
    let pagination = match next {
        NextControl::Enabled => {
            r#"<li class="p-next"><a aria-label="Next page" href="?pagenumber=2">Weiter</a></li>"#
        }
        NextControl::Disabled => {
            r#"<li class="p-next disabled"><a aria-label="Next page">Weiter</a></li>"#
        }
        NextControl::Absent => "",
    };
    format!(
        r#"<html><body>
             <ul id="resultListItems">{}</ul>
             <ul class="reactPagination">{}</ul>
           </body></html>"#,
        entries, pagination
    )
}

/// Serves a fixed sequence of pages; each "next" click advances one page.
pub struct ScriptedSession {
    pages: Vec<String>,
    current: Option<usize>,
    pub navigations: Vec<String>,
    pub clicks: usize,
    /// Number of upcoming loads (navigate or click) that fail
    pub failing_loads: u32,
    /// Selector whose query returns an error
    pub broken_selector: Option<String>,
}

impl ScriptedSession {
    pub fn new(pages: Vec<String>) -> Self {
        Self {
            pages,
            current: Some(0),
            navigations: Vec::new(),
            clicks: 0,
            failing_loads: 0,
            broken_selector: None,
        }
    }

    /// Like `new`, but nothing is loaded until `navigate`
    pub fn unloaded(pages: Vec<String>) -> Self {
        Self {
            current: None,
            ..Self::new(pages)
        }
    }

    /// Page loads performed, first navigation included
    pub fn fetches(&self) -> usize {
        self.navigations.len() + self.clicks
    }

    fn document(&self, selector: &str) -> Result<HtmlDocument, SessionError> {
        if self.broken_selector.as_deref() == Some(selector) {
            return Err(SessionError::Query {
                selector: selector.to_string(),
                reason: "stale element reference".to_string(),
            });
        }
        let index = self.current.ok_or_else(|| SessionError::Query {
            selector: selector.to_string(),
            reason: "no page loaded".to_string(),
        })?;
        Ok(HtmlDocument::new(self.pages[index].clone()))
    }

    fn take_failure(&mut self) -> bool {
        if self.failing_loads > 0 {
            self.failing_loads -= 1;
            return true;
        }
        false
    }
}

#[async_trait]
impl PageSession for ScriptedSession {
    type Element = HtmlElement;

    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        if self.take_failure() {
            return Err(SessionError::Navigation {
                url: url.to_string(),
                reason: "connection reset".to_string(),
            });
        }
        self.navigations.push(url.to_string());
        self.current = Some(0);
        Ok(())
    }

    fn find_all(&self, selector: &str) -> Result<Vec<HtmlElement>, SessionError> {
        self.document(selector)?.find_all(selector)
    }

    fn find_one(&self, selector: &str) -> Result<Option<HtmlElement>, SessionError> {
        self.document(selector)?.find_one(selector)
    }

    async fn click(&mut self, _element: &HtmlElement) -> Result<(), SessionError> {
        if self.take_failure() {
            return Err(SessionError::Interaction("click intercepted".to_string()));
        }
        let next = self.current.map(|i| i + 1).unwrap_or(0);
        if next >= self.pages.len() {
            return Err(SessionError::Navigation {
                url: format!("page {}", next + 1),
                reason: "no such page".to_string(),
            });
        }
        self.clicks += 1;
        self.current = Some(next);
        Ok(())
    }

    async fn settle(&self, _pause: Duration) {}

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}
