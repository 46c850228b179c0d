mod adapters;
mod analytics;
mod api;
mod cache;
mod config;
mod error;
mod refresh;
mod stats;
mod types;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::adapters::{AccesimobilAdapter, ListingSource, Md999Adapter, ProimobilAdapter};
use crate::analytics::AnalyticsEngine;
use crate::api::{router, ApiState};
use crate::cache::{SnapshotCache, SystemClock};
use crate::config::Config;
use crate::error::Result;
use crate::refresh::CacheRefresher;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let adapters: Vec<Arc<dyn ListingSource>> = vec![
        Arc::new(ProimobilAdapter::new(
            cfg.proimobil_url.clone(),
            cfg.max_items_per_source,
        )),
        Arc::new(AccesimobilAdapter::new(
            cfg.accesimobil_url.clone(),
            cfg.max_items_per_source,
        )),
        Arc::new(Md999Adapter::new(
            cfg.md999_url.clone(),
            cfg.max_items_per_source,
        )),
    ];

    let cache = SnapshotCache::new(adapters, Arc::new(SystemClock), cfg.cache_ttl_secs);

    // Warm every key before serving; first requests should not pay the
    // build latency.
    info!("warming cache from all sources");
    cache.refresh_all().await;

    let refresher = CacheRefresher::new(Arc::clone(&cache), cfg.refresh_interval_secs);
    let refresher_handle = tokio::spawn(async move { refresher.run().await });

    let engine = Arc::new(AnalyticsEngine::new(Arc::clone(&cache)));
    let app = router(ApiState { cache, engine });

    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    refresher_handle.abort();
    Ok(())
}
