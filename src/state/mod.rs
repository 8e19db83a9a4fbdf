//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `UrlState`: Tracks the state of individual URLs (in frontier, fetching, processed, etc.)
//! - `CrawlState`: The frontier, seen set and record accumulator shared by the workers

mod crawl_state;
mod url_state;

pub use crawl_state::{CrawlState, CrawlStats, FrontierEntry};
pub use url_state::UrlState;
