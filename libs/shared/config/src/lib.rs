use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_key: String,
    pub service_timezone: String,
    pub version_poll_interval_seconds: u64,
    pub request_timeout_seconds: u64,
    pub version_store_path: String,
    pub late_after_minutes: i64,
    pub missed_after_minutes: i64,
    pub bind_address: String,
    pub record_cache_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            api_key: String::new(),
            service_timezone: "UTC".to_string(),
            version_poll_interval_seconds: 30,
            request_timeout_seconds: 10,
            version_store_path: ".dashboard-storage.json".to_string(),
            late_after_minutes: 60,
            missed_after_minutes: 240,
            bind_address: "0.0.0.0:3000".to_string(),
            record_cache_capacity: 8,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            api_base_url: env::var("FOODBANK_API_URL")
                .unwrap_or_else(|_| {
                    warn!("FOODBANK_API_URL not set, using empty value");
                    String::new()
                }),
            api_key: env::var("FOODBANK_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("FOODBANK_API_KEY not set, requests will be unauthenticated");
                    String::new()
                }),
            service_timezone: env::var("SERVICE_TIMEZONE")
                .unwrap_or_else(|_| {
                    warn!("SERVICE_TIMEZONE not set, using default");
                    defaults.service_timezone.clone()
                }),
            version_poll_interval_seconds: numeric_var(
                "VERSION_POLL_INTERVAL_SECONDS",
                defaults.version_poll_interval_seconds,
            ),
            request_timeout_seconds: numeric_var(
                "API_REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
            version_store_path: env::var("DATA_VERSION_STORE_PATH")
                .unwrap_or_else(|_| {
                    warn!("DATA_VERSION_STORE_PATH not set, using default");
                    defaults.version_store_path.clone()
                }),
            late_after_minutes: numeric_var("LATE_AFTER_MINUTES", defaults.late_after_minutes),
            missed_after_minutes: numeric_var("MISSED_AFTER_MINUTES", defaults.missed_after_minutes),
            bind_address: env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| defaults.bind_address.clone()),
            record_cache_capacity: numeric_var("RECORD_CACHE_CAPACITY", defaults.record_cache_capacity),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        if config.late_after_minutes <= 0 || config.late_after_minutes >= config.missed_after_minutes {
            warn!(
                "LATE_AFTER_MINUTES ({}) must be positive and below MISSED_AFTER_MINUTES ({})",
                config.late_after_minutes, config.missed_after_minutes
            );
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.api_base_url.is_empty()
    }
}

fn numeric_var<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
