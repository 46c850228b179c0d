//! 999.md adapter — offset-paginated API, `{"ads": [...]}` envelope with a
//! flat `features` object.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::adapters::{http_client, ListingSource};
use crate::error::{AppError, Result};
use crate::types::{Listing, Source};

const PAGE_SIZE: usize = 200;

pub struct Md999Adapter {
    base_url: String,
    max_items: usize,
}

impl Md999Adapter {
    pub fn new(base_url: String, max_items: usize) -> Self {
        Self { base_url, max_items }
    }
}

#[async_trait]
impl ListingSource for Md999Adapter {
    fn source(&self) -> Source {
        Source::Md999
    }

    async fn fetch_listings(&self) -> Result<Vec<Listing>> {
        let client = http_client()?;
        let mut listings = Vec::new();
        let mut skipped = 0usize;
        let mut offset = 0usize;

        loop {
            let url = format!(
                "{}?category=real-estate-apartments&offset={}&limit={}",
                self.base_url, offset, PAGE_SIZE
            );
            let resp: serde_json::Value = client.get(&url).send().await?.json().await?;

            let items = resp
                .get("ads")
                .and_then(|a| a.as_array())
                .ok_or_else(|| AppError::Adapter("999md response missing `ads` array".to_string()))?;

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
            offset += PAGE_SIZE;
        }

        if skipped > 0 {
            warn!(skipped, "999md: skipped unparseable items");
        }
        debug!(count = listings.len(), "999md: fetch complete");
        Ok(listings)
    }
}

fn parse_item(item: &serde_json::Value) -> Option<Listing> {
    let id = item.get("ad_id")?;
    let id = match id {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let price_eur = item.get("price_eur")?.as_f64()?;
    let features = item.get("features")?;
    let surface_sqm = features.get("surface")?.as_f64()?;
    let rooms = features.get("rooms")?.as_u64()? as u32;
    let sector = item
        .get("region")
        .and_then(|r| r.as_str())
        .map(strip_city_prefix)
        .unwrap_or_default();
    let url_slug = item
        .get("slug")
        .and_then(|s| s.as_str())
        .unwrap_or(&id)
        .to_string();

    Some(Listing {
        id,
        price_eur,
        surface_sqm,
        rooms,
        sector,
        street: None,
        url_slug,
    })
}

/// 999.md regions come as "Chișinău, Botanica" — keep the sector part only.
fn strip_city_prefix(region: &str) -> String {
    region
        .rsplit(',')
        .next()
        .map(str::trim)
        .unwrap_or("")
        .to_string()
}
