//! Owned HTML snapshots queried with `scraper`.
//!
//! Elements keep their outer HTML and are re-parsed as a fragment on each
//! query, so handles are `Send` and outlive the document they came from.

use crate::error::SessionError;
use crate::scrapers::traits::PageElement;
use scraper::{ElementRef, Html, Selector};

pub fn compile(selector: &str) -> Result<Selector, SessionError> {
    Selector::parse(selector).map_err(|e| SessionError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// A full page of server-rendered HTML
#[derive(Debug, Clone, Default)]
pub struct HtmlDocument {
    html: String,
}

impl HtmlDocument {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn find_all(&self, selector: &str) -> Result<Vec<HtmlElement>, SessionError> {
        let selector = compile(selector)?;
        let document = Html::parse_document(&self.html);
        let elements = document
            .select(&selector)
            .map(|el| HtmlElement::new(el.html()))
            .collect();
        Ok(elements)
    }

    pub fn find_one(&self, selector: &str) -> Result<Option<HtmlElement>, SessionError> {
        let selector = compile(selector)?;
        let document = Html::parse_document(&self.html);
        let element = document
            .select(&selector)
            .next()
            .map(|el| HtmlElement::new(el.html()));
        Ok(element)
    }
}

/// One element, held as its outer HTML
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlElement {
    html: String,
}

impl HtmlElement {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    fn with_root<T>(&self, f: impl FnOnce(ElementRef<'_>) -> T) -> Result<T, SessionError> {
        let fragment = Html::parse_fragment(&self.html);
        let root = fragment
            .root_element()
            .children()
            .find_map(ElementRef::wrap)
            .ok_or_else(|| {
                SessionError::Interaction(format!("detached element: {:.60}", self.html))
            })?;
        Ok(f(root))
    }

    fn descendants(&self, selector: &str, limit: Option<usize>) -> Result<Vec<Self>, SessionError> {
        let selector = compile(selector)?;
        self.with_root(|root| {
            let matches = root
                .select(&selector)
                .filter(|el| el.id() != root.id())
                .map(|el| HtmlElement::new(el.html()));
            match limit {
                Some(n) => matches.take(n).collect(),
                None => matches.collect(),
            }
        })
    }
}

impl PageElement for HtmlElement {
    fn find_one(&self, selector: &str) -> Result<Option<Self>, SessionError> {
        Ok(self.descendants(selector, Some(1))?.into_iter().next())
    }

    fn find_all(&self, selector: &str) -> Result<Vec<Self>, SessionError> {
        self.descendants(selector, None)
    }

    fn text(&self) -> Result<String, SessionError> {
        self.with_root(|root| {
            // Text nodes of sibling blocks must not run together
            let raw = root.text().collect::<Vec<_>>().join(" ");
            raw.split_whitespace().collect::<Vec<_>>().join(" ")
        })
    }

    fn attribute(&self, name: &str) -> Result<Option<String>, SessionError> {
        self.with_root(|root| root.value().attr(name).map(str::to_string))
    }
}
