//! proimobil.md adapter — paged REST API, `{"data": [...], "meta": {...}}`
//! envelope with nested location objects.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::adapters::{http_client, ListingSource};
use crate::error::{AppError, Result};
use crate::types::{Listing, Source};

const PAGE_SIZE: usize = 100;

pub struct ProimobilAdapter {
    base_url: String,
    max_items: usize,
}

impl ProimobilAdapter {
    pub fn new(base_url: String, max_items: usize) -> Self {
        Self { base_url, max_items }
    }
}

#[async_trait]
impl ListingSource for ProimobilAdapter {
    fn source(&self) -> Source {
        Source::Proimobil
    }

    async fn fetch_listings(&self) -> Result<Vec<Listing>> {
        let client = http_client()?;
        let mut listings = Vec::new();
        let mut skipped = 0usize;
        let mut page = 1usize;

        loop {
            let url = format!(
                "{}?category=apartments&page={}&per_page={}",
                self.base_url, page, PAGE_SIZE
            );
            let resp: serde_json::Value = client.get(&url).send().await?.json().await?;

            let items = resp
                .get("data")
                .and_then(|d| d.as_array())
                .ok_or_else(|| {
                    AppError::Adapter("proimobil response missing `data` array".to_string())
                })?;

            if items.is_empty() {
                break;
            }

            for item in items {
                match parse_item(item) {
                    Some(listing) => listings.push(listing),
                    None => skipped += 1,
                }
                if listings.len() >= self.max_items {
                    break;
                }
            }

            if listings.len() >= self.max_items || items.len() < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        if skipped > 0 {
            warn!(skipped, "proimobil: skipped unparseable items");
        }
        debug!(count = listings.len(), "proimobil: fetch complete");
        Ok(listings)
    }
}

fn parse_item(item: &serde_json::Value) -> Option<Listing> {
    let id = item.get("id")?;
    let id = match id {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let price_eur = item.get("price_eur")?.as_f64()?;
    let surface_sqm = item.get("surface")?.as_f64()?;
    let rooms = item.get("rooms")?.as_u64()? as u32;
    let location = item.get("location");
    let sector = location
        .and_then(|l| l.get("sector"))
        .and_then(|s| s.as_str())
        .unwrap_or("")
        .to_string();
    let street = location
        .and_then(|l| l.get("street"))
        .and_then(|s| s.as_str())
        .map(str::to_string);
    let url_slug = item
        .get("slug")
        .and_then(|s| s.as_str())
        .unwrap_or(&id)
        .to_string();

    Some(Listing { id, price_eur, surface_sqm, rooms, sector, street, url_slug })
}
