use crate::scrapers::types::{SearchParams, WalkerConfig};
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug)]
pub struct Config {
    pub base_url: String,
    pub search: SearchParams,
    pub database_url: String,
    pub log_dir: PathBuf,
    pub output_json: PathBuf,
    pub max_pages: u32,
    pub settle: Duration,
    pub page_timeout: Duration,
    pub load_retries: u32,
}

impl Config {
    /// Read `IMMO_*` variables from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let text = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());
        let optional = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let defaults = SearchParams::default();
        Ok(Self {
            base_url: text("IMMO_BASE_URL", "https://www.immobilienscout24.de"),
            search: SearchParams {
                region_path: text("IMMO_REGION_PATH", &defaults.region_path),
                rooms: optional("IMMO_ROOMS"),
                price: optional("IMMO_PRICE"),
                living_space: optional("IMMO_LIVING_SPACE"),
            },
            database_url: text("IMMO_DATABASE_URL", "sqlite://listings.db?mode=rwc"),
            log_dir: text("IMMO_LOG_DIR", "logs").into(),
            output_json: text("IMMO_OUTPUT_JSON", "scraped_listings.json").into(),
            max_pages: number(&lookup, "IMMO_MAX_PAGES", 200)?,
            settle: Duration::from_secs(number(&lookup, "IMMO_SETTLE_SECS", 5)?),
            page_timeout: Duration::from_secs(number(&lookup, "IMMO_PAGE_TIMEOUT_SECS", 30)?),
            load_retries: number(&lookup, "IMMO_LOAD_RETRIES", 2)?,
        })
    }

    pub fn walker(&self) -> WalkerConfig {
        WalkerConfig {
            base_url: self.base_url.clone(),
            search: self.search.clone(),
            max_pages: self.max_pages,
            settle: self.settle,
            load_retries: self.load_retries,
        }
    }
}

fn number<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got {:?}", name, raw)),
        None => Ok(default),
    }
}
