//! News source scrapers.
//!
//! Each scraper follows the same two-phase pattern:
//!
//! 1. **Indexing**: Discover article URLs from the source's section page
//! 2. **Fetching**: Download and parse article content from each URL,
//!    keeping only articles that match the source's keyword filter
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | Le Soleil (politics) | [`lesoleil`] | HTML scraping | Election coverage only |
//!
//! Failed article fetches are logged and skipped; a failed index fetch is
//! reported to the caller.

pub mod lesoleil;

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}
