//! URL handling module for Scrape-Bench
//!
//! This module provides domain identity, URL canonicalization, same-site
//! matching and the link filter applied to homepage links.

mod domain;
mod filter;
mod matcher;
mod normalize;

pub use domain::{strip_www, Domain};
pub use filter::{filter_links, prioritize_links, DiscoveredLinks};
pub use matcher::is_same_site;
pub use normalize::{canonical_url, page_name, slugify};
