//! Site scraping for SEO Studio.
//!
//! This crate provides:
//! - [`PageFetcher`]: one-shot link discovery, metadata and body-text fetches
//! - [`truncate_chars`]: character-safe truncation used for page context

pub mod engine;
mod extract;

pub use engine::{PageFetcher, truncate_chars};
