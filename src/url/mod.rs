//! URL handling module
//!
//! This module provides URL normalization and same-site scoping. Every
//! membership test in the crawl frontier and every cache key runs on
//! normalized URLs, so equivalent spellings of the same address dedup
//! correctly.

mod domain;
mod normalize;

pub use domain::{extract_domain, is_same_site};
pub use normalize::normalize_url;
