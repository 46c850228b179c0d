use crate::error::{AppError, Result};

pub const PROIMOBIL_API_URL: &str = "https://api.proimobil.md/v1/properties";
pub const ACCESIMOBIL_API_URL: &str = "https://accesimobil.md/api/listings";
pub const MD999_API_URL: &str = "https://999.md/api/ads";

/// Default snapshot TTL (seconds). A snapshot older than this is served
/// stale while a background rebuild runs.
pub const CACHE_TTL_SECS: u64 = 1800;

/// Background refresh loop period (seconds). Aligned with the TTL by
/// default but configurable independently.
pub const REFRESH_INTERVAL_SECS: u64 = 1800;

/// Max listings fetched per source per refresh.
pub const MAX_ITEMS_PER_SOURCE: usize = 1000;

/// Adapter HTTP timeout (seconds).
pub const ADAPTER_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub proimobil_url: String,
    pub accesimobil_url: String,
    pub md999_url: String,
    pub log_level: String,
    pub api_port: u16,
    pub cache_ttl_secs: u64,
    pub refresh_interval_secs: u64,
    pub max_items_per_source: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            proimobil_url: std::env::var("PROIMOBIL_API_URL")
                .unwrap_or_else(|_| PROIMOBIL_API_URL.to_string()),
            accesimobil_url: std::env::var("ACCESIMOBIL_API_URL")
                .unwrap_or_else(|_| ACCESIMOBIL_API_URL.to_string()),
            md999_url: std::env::var("MD999_API_URL")
                .unwrap_or_else(|_| MD999_API_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            cache_ttl_secs: std::env::var("CACHE_TTL_SECS")
                .unwrap_or_else(|_| CACHE_TTL_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(CACHE_TTL_SECS),
            refresh_interval_secs: std::env::var("REFRESH_INTERVAL_SECS")
                .unwrap_or_else(|_| REFRESH_INTERVAL_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(REFRESH_INTERVAL_SECS),
            max_items_per_source: std::env::var("MAX_ITEMS_PER_SOURCE")
                .unwrap_or_else(|_| MAX_ITEMS_PER_SOURCE.to_string())
                .parse::<usize>()
                .unwrap_or(MAX_ITEMS_PER_SOURCE),
        })
    }
}
