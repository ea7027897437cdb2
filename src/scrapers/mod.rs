pub mod browser;
pub mod dom;
pub mod extractor;
pub mod fields;
pub mod http;
pub mod traits;
pub mod types;
pub mod walker;

#[cfg(test)]
mod fixtures;

pub use browser::ChromeSession;
pub use http::HttpSession;
pub use traits::{ConsolePrompt, NoPause, OperatorGate, PageSession};
pub use walker::PaginationWalker;
