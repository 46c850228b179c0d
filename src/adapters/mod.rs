//! Listing source adapters. Each marketplace exposes a JSON API with its
//! own response shape; adapters normalize everything to `Listing`.

pub mod accesimobil;
pub mod md999;
pub mod proimobil;

pub use accesimobil::AccesimobilAdapter;
pub use md999::Md999Adapter;
pub use proimobil::ProimobilAdapter;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::ADAPTER_TIMEOUT_SECS;
use crate::error::Result;
use crate::types::{Listing, Source};

/// A marketplace that can produce a sequence of normalized listings.
/// Implementations own their HTTP timeouts; any fetch or parse failure
/// surfaces as an error that the cache treats as a build failure.
#[async_trait]
pub trait ListingSource: Send + Sync {
    fn source(&self) -> Source;

    async fn fetch_listings(&self) -> Result<Vec<Listing>>;
}

pub(crate) fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(ADAPTER_TIMEOUT_SECS))
        .build()?)
}
