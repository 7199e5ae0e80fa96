use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    pub paging: PagingConfig,
    pub polling: PollingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    /// Request timeout in seconds. A timed-out call is classified exactly
    /// like any other network failure.
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagingConfig {
    pub page_size: u32,
    pub initial_load_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    pub interval_secs: u64,
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:data/feedsync.db".to_string(),
                max_connections: 5,
            },
            remote: RemoteConfig {
                base_url: "http://localhost:9999".to_string(),
                request_timeout: 30,
            },
            paging: PagingConfig {
                page_size: 10,
                initial_load_size: 30,
            },
            polling: PollingConfig { interval_secs: 10 },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("FEEDSYNC_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v;
            }
        }
        if let Ok(v) = std::env::var("FEEDSYNC_DATABASE_MAX_CONNECTIONS") {
            if let Some(value) = parse_u32(&v) {
                cfg.database.max_connections = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("FEEDSYNC_REMOTE_BASE_URL") {
            if !v.trim().is_empty() {
                cfg.remote.base_url = v.trim().trim_end_matches('/').to_string();
            }
        }
        if let Ok(v) = std::env::var("FEEDSYNC_REMOTE_TIMEOUT_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.remote.request_timeout = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("FEEDSYNC_PAGE_SIZE") {
            if let Some(value) = parse_u32(&v) {
                cfg.paging.page_size = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("FEEDSYNC_INITIAL_LOAD_SIZE") {
            if let Some(value) = parse_u32(&v) {
                cfg.paging.initial_load_size = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("FEEDSYNC_POLL_INTERVAL_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.polling.interval_secs = value.max(1);
            }
        }

        cfg
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.remote.base_url.trim().is_empty() {
            return Err("Remote base_url must not be empty".to_string());
        }
        if self.paging.page_size == 0 || self.paging.initial_load_size == 0 {
            return Err("Paging sizes must be greater than 0".to_string());
        }
        if self.polling.interval_secs == 0 {
            return Err("Polling interval_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn parse_u32(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok()
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.polling.interval_secs = 0;
        assert!(cfg.validate().is_err());
    }
}
