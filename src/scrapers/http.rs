use crate::error::SessionError;
use crate::scrapers::dom::{HtmlDocument, HtmlElement};
use crate::scrapers::traits::{PageElement, PageSession};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Plain HTTP session for server-rendered result pages.
/// Clicking a control follows its `href`.
pub struct HttpSession {
    client: Client,
    current_url: Option<Url>,
    document: HtmlDocument,
}

impl HttpSession {
    pub fn new(page_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(page_timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            current_url: None,
            document: HtmlDocument::default(),
        })
    }

    async fn fetch(&mut self, url: Url) -> Result<(), SessionError> {
        let navigation_error = |reason: String| SessionError::Navigation {
            url: url.to_string(),
            reason,
        };

        debug!("Fetching URL: {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| navigation_error(e.to_string()))?;

        if !response.status().is_success() {
            warn!("{} returned status: {}", url, response.status());
            return Err(navigation_error(format!("HTTP {}", response.status())));
        }

        let final_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| navigation_error(format!("failed to read response body: {}", e)))?;
        debug!("Downloaded {} bytes of HTML", html.len());

        self.current_url = Some(final_url);
        self.document = HtmlDocument::new(html);
        Ok(())
    }
}

#[async_trait]
impl PageSession for HttpSession {
    type Element = HtmlElement;

    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        let url = Url::parse(url).map_err(|e| SessionError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        self.fetch(url).await
    }

    fn find_all(&self, selector: &str) -> Result<Vec<HtmlElement>, SessionError> {
        self.document.find_all(selector)
    }

    fn find_one(&self, selector: &str) -> Result<Option<HtmlElement>, SessionError> {
        self.document.find_one(selector)
    }

    async fn click(&mut self, element: &HtmlElement) -> Result<(), SessionError> {
        let href = element
            .attribute("href")?
            .ok_or_else(|| SessionError::Interaction("control has no href".to_string()))?;
        let base = self
            .current_url
            .as_ref()
            .ok_or_else(|| SessionError::Interaction("no page loaded".to_string()))?;
        let target = base.join(&href).map_err(|e| SessionError::Navigation {
            url: href.clone(),
            reason: e.to_string(),
        })?;
        self.fetch(target).await
    }

    async fn settle(&self, pause: Duration) {
        tokio::time::sleep(pause).await;
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const FIRST_PAGE: &str = r#"<html><body>
        <li class="result-list__listing" data-id="1">Erste</li>
        <a aria-label="Next page" href="page2">Weiter</a>
      </body></html>"#;
    const SECOND_PAGE: &str = r#"<html><body>
        <li class="result-list__listing" data-id="2">Zweite</li>
      </body></html>"#;

    /// Serve canned pages on a local port; `/start` redirects into `/results/`.
    async fn serve_pages() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = stream.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]);
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

                    let response = match path.as_str() {
                        "/start" => "HTTP/1.1 302 Found\r\nLocation: /results/page1\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string(),
                        "/results/page1" => page_response(FIRST_PAGE),
                        "/results/page2" => page_response(SECOND_PAGE),
                        _ => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string(),
                    };
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        format!("http://{}", addr)
    }

    fn page_response(body: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        )
    }

    // Bypasses any proxy configured in the environment
    fn local_session() -> HttpSession {
        HttpSession {
            client: Client::builder()
                .no_proxy()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap(),
            current_url: None,
            document: HtmlDocument::default(),
        }
    }

    fn listing_ids(session: &HttpSession) -> Vec<String> {
        session
            .find_all(".result-list__listing")
            .unwrap()
            .iter()
            .filter_map(|el| el.attribute("data-id").unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_navigate_follows_redirect_and_click_resolves_relative_href() {
        let base = serve_pages().await;
        let mut session = local_session();

        session.navigate(&format!("{}/start", base)).await.unwrap();
        assert_eq!(
            session.current_url.as_ref().map(Url::as_str),
            Some(format!("{}/results/page1", base).as_str())
        );
        assert_eq!(listing_ids(&session), vec!["1"]);

        let next = session
            .find_one("a[aria-label='Next page']")
            .unwrap()
            .unwrap();
        session.click(&next).await.unwrap();
        assert_eq!(
            session.current_url.as_ref().map(Url::as_str),
            Some(format!("{}/results/page2", base).as_str())
        );
        assert_eq!(listing_ids(&session), vec!["2"]);
    }

    #[tokio::test]
    async fn test_error_status_keeps_previous_page() {
        let base = serve_pages().await;
        let mut session = local_session();
        session
            .navigate(&format!("{}/results/page1", base))
            .await
            .unwrap();

        let err = session
            .navigate(&format!("{}/missing", base))
            .await
            .unwrap_err();
        match err {
            SessionError::Navigation { reason, .. } => assert!(reason.contains("404")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(listing_ids(&session), vec!["1"]);
        assert_eq!(
            session.current_url.as_ref().map(Url::as_str),
            Some(format!("{}/results/page1", base).as_str())
        );
    }

    #[tokio::test]
    async fn test_click_without_href_fails() {
        let mut session = HttpSession::new(Duration::from_secs(1)).unwrap();
        let control = HtmlElement::new(r#"<a aria-label="Next page">Weiter</a>"#);
        let err = session.click(&control).await.unwrap_err();
        assert!(matches!(err, SessionError::Interaction(_)));
    }

    #[tokio::test]
    async fn test_click_before_navigation_fails() {
        let mut session = HttpSession::new(Duration::from_secs(1)).unwrap();
        let control = HtmlElement::new(r#"<a href="?pagenumber=2">Weiter</a>"#);
        let err = session.click(&control).await.unwrap_err();
        assert!(matches!(err, SessionError::Interaction(_)));
    }

    #[tokio::test]
    async fn test_invalid_url_is_navigation_error() {
        let mut session = HttpSession::new(Duration::from_secs(1)).unwrap();
        let err = session.navigate("not a url").await.unwrap_err();
        assert!(matches!(err, SessionError::Navigation { .. }));
        assert!(session.find_all("li").unwrap().is_empty());
    }
}
