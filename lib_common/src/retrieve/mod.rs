//! # Data Retrieval Module
//!
//! Generic retrieval plumbing shared by every upstream source.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: A time-boxed JSON `ApiClient` built on `reqwest`. It never
//!   retries; retry and fallback policy live one layer up in the fallback chain.
//! - **`cache`**: A TTL cache for slow-moving lookups (season schedule,
//!   standings, results). The live tick path never goes through it.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Time-boxed HTTP JSON client with failure classification.
pub mod ky_http;
/// Freshness-checked result cache keyed by lookup name.
pub mod cache;

pub use cache::{CacheEntry, ResultCache, DEFAULT_CACHE_TTL};
pub use ky_http::{ApiClient, DEFAULT_TIMEOUT};
