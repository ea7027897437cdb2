use crate::error::SessionError;
use async_trait::async_trait;
use std::time::Duration;

/// A handle to one element of a loaded page
pub trait PageElement: Send + Sync + Sized {
    /// First descendant matching `selector`, if any
    fn find_one(&self, selector: &str) -> Result<Option<Self>, SessionError>;

    /// All descendants matching `selector`, in document order
    fn find_all(&self, selector: &str) -> Result<Vec<Self>, SessionError>;

    /// Rendered text with whitespace collapsed
    fn text(&self) -> Result<String, SessionError>;

    fn attribute(&self, name: &str) -> Result<Option<String>, SessionError>;
}

/// A single serial page session (browser tab or HTTP client).
/// Pagination drives it strictly one page at a time.
#[async_trait]
pub trait PageSession: Send + Sync {
    type Element: PageElement;

    async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    fn find_all(&self, selector: &str) -> Result<Vec<Self::Element>, SessionError>;

    fn find_one(&self, selector: &str) -> Result<Option<Self::Element>, SessionError>;

    /// Activate `element` and wait for the resulting page
    async fn click(&mut self, element: &Self::Element) -> Result<(), SessionError>;

    /// Give the page time to settle after a load
    async fn settle(&self, pause: Duration);

    /// Name of the session backend
    fn backend_name(&self) -> &'static str;
}

/// Waits until an operator signals the page is usable (e.g. a CAPTCHA was solved)
#[async_trait]
pub trait OperatorGate: Send + Sync {
    async fn wait_until_ready(&self) -> anyhow::Result<()>;
}

/// Gate that never waits
pub struct NoPause;

#[async_trait]
impl OperatorGate for NoPause {
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Gate that prompts on the terminal and waits for Enter.
/// The stdin read runs on the blocking pool.
pub struct ConsolePrompt;

#[async_trait]
impl OperatorGate for ConsolePrompt {
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        use anyhow::Context;

        tokio::task::spawn_blocking(|| -> anyhow::Result<()> {
            use std::io::Write;

            print!("Please solve the CAPTCHA in the browser and then press Enter to continue...");
            std::io::stdout().flush()?;
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            Ok(())
        })
        .await
        .context("Operator prompt task failed")?
    }
}
