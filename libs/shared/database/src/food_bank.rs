use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION},
    Client, StatusCode,
};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use shared_config::AppConfig;
use shared_models::error::ApiError;

pub const APPOINTMENTS_PATH: &str = "/api/appointments";
pub const DAILY_STATUS_PATH: &str = "/api/daily-status";

/// Read-only client for the food-bank appointments API.
#[derive(Clone)]
pub struct FoodBankClient {
    client: Client,
    base_url: String,
    api_key: String,
    timeout_seconds: u64,
}

impl FoodBankClient {
    pub fn new(config: &AppConfig) -> Self {
        let timeout_seconds = config.request_timeout_seconds.max(1);
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout, using defaults: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout_seconds,
        }
    }

    fn get_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if !self.api_key.is_empty() {
            match HeaderValue::from_str(&format!("Bearer {}", self.api_key)) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("FOODBANK_API_KEY contains invalid header characters, skipping auth header"),
            }
        }

        headers
    }

    pub async fn get<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        if self.base_url.is_empty() {
            return Err(ApiError::NotConfigured);
        }

        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let response = self
            .client
            .get(&url)
            .headers(self.get_headers())
            .query(query)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            debug!("Upstream rate limited request to {}", path);
            return Err(ApiError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, body);
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.map_transport(e))?;
        serde_json::from_slice::<T>(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Fetch the appointments/check-ins listing, optionally for a specific service date.
    pub async fn list_appointments<T>(&self, date: Option<NaiveDate>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let query: Vec<(&str, String)> = date
            .map(|d| vec![("date", d.format("%Y-%m-%d").to_string())])
            .unwrap_or_default();

        self.get(APPOINTMENTS_PATH, &query).await
    }

    pub async fn daily_status<T>(&self) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.get(DAILY_STATUS_PATH, &[]).await
    }

    fn map_transport(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout {
                timeout_seconds: self.timeout_seconds,
            }
        } else {
            ApiError::Transport(err)
        }
    }
}
