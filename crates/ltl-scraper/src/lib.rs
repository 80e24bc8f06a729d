//! Bluesky search scraper.
//!
//! Authenticates with an app password, pages through `searchPosts` until the
//! requested number of posts is collected or the result stream ends, cleans
//! each record, and persists the raw dataset either in one write (batch) or
//! page by page (streaming).

pub mod client;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod types;

pub use client::{BlueskyClient, PostPager, Session, MAX_PAGES, MAX_PAGE_SIZE};
pub use error::ScraperError;
pub use normalize::{strip_urls, NormalizeOptions, NormalizeStats, Normalizer};
pub use pipeline::{scrape, ScrapeRequest};
