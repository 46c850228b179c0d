//! accesimobil.md adapter — single-request API returning a bare JSON array
//! with nested `price`/`characteristics` objects.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::adapters::{http_client, ListingSource};
use crate::error::{AppError, Result};
use crate::types::{Listing, Source};

pub struct AccesimobilAdapter {
    base_url: String,
    max_items: usize,
}

impl AccesimobilAdapter {
    pub fn new(base_url: String, max_items: usize) -> Self {
        Self { base_url, max_items }
    }
}

#[async_trait]
impl ListingSource for AccesimobilAdapter {
    fn source(&self) -> Source {
        Source::Accesimobil
    }

    async fn fetch_listings(&self) -> Result<Vec<Listing>> {
        let client = http_client()?;
        let url = format!("{}?type=apartment&limit={}", self.base_url, self.max_items);
        let resp: serde_json::Value = client.get(&url).send().await?.json().await?;

        let items = resp.as_array().ok_or_else(|| {
            AppError::Adapter("accesimobil response was not an array".to_string())
        })?;

        let mut listings = Vec::new();
        let mut skipped = 0usize;
        for item in items.iter().take(self.max_items) {
            match parse_item(item) {
                Some(listing) => listings.push(listing),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(skipped, "accesimobil: skipped unparseable items");
        }
        debug!(count = listings.len(), "accesimobil: fetch complete");
        Ok(listings)
    }
}

fn parse_item(item: &serde_json::Value) -> Option<Listing> {
    let id = item.get("listing_id")?.as_str()?.to_string();
    let price_eur = item.get("price")?.get("amount_eur")?.as_f64()?;
    let characteristics = item.get("characteristics")?;
    let surface_sqm = characteristics.get("area_m2")?.as_f64()?;
    let rooms = characteristics.get("rooms")?.as_u64()? as u32;
    let sector = item
        .get("district")
        .and_then(|d| d.as_str())
        .unwrap_or("")
        .to_string();
    let street = item
        .get("address")
        .and_then(|a| a.as_str())
        .map(str::to_string);
    let url_slug = item
        .get("url")
        .and_then(|u| u.as_str())
        .and_then(|u| u.rsplit('/').next())
        .unwrap_or(&id)
        .to_string();

    Some(Listing { id, price_eur, surface_sqm, rooms, sector, street, url_slug })
}
