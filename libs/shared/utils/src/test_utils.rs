use serde_json::{json, Value};

use shared_config::AppConfig;

pub struct TestConfig {
    pub api_base_url: String,
    pub service_timezone: String,
    pub request_timeout_seconds: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            service_timezone: "UTC".to_string(),
            request_timeout_seconds: 2,
        }
    }
}

impl TestConfig {
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            api_base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            api_base_url: self.api_base_url.clone(),
            api_key: "test-api-key".to_string(),
            service_timezone: self.service_timezone.clone(),
            request_timeout_seconds: self.request_timeout_seconds,
            version_poll_interval_seconds: 1,
            ..AppConfig::default()
        }
    }
}

/// JSON bodies shaped like the upstream food-bank API.
pub struct MockFoodBankResponses;

impl MockFoodBankResponses {
    /// A record whose only time field is the full timestamp.
    pub fn record_with_timestamp(id: i64, name: &str, status: &str, timestamp: &str) -> Value {
        json!({
            "id": id,
            "clientName": name,
            "status": status,
            "appointmentTimestamp": timestamp,
            "appointmentIso": null,
            "appointmentTime": null
        })
    }

    /// A record carrying only the bare `HH:MM` local time.
    pub fn record_with_clock_time(id: i64, name: &str, status: &str, time: &str) -> Value {
        json!({
            "id": id,
            "clientName": name,
            "status": status,
            "appointmentTime": time
        })
    }

    pub fn unresolvable_record(id: i64, name: &str) -> Value {
        json!({
            "id": id,
            "clientName": name,
            "status": "scheduled",
            "appointmentTimestamp": "not a date",
            "appointmentIso": "2024-13-45",
            "appointmentTime": "25:99"
        })
    }

    pub fn appointments_response(records: Vec<Value>) -> Value {
        json!({
            "success": true,
            "data": records
        })
    }

    pub fn failed_appointments_response(message: &str) -> Value {
        json!({
            "success": false,
            "message": message
        })
    }

    pub fn daily_status_response(version: Option<&str>, record_count: u64) -> Value {
        json!({
            "success": true,
            "hasData": record_count > 0,
            "recordCount": record_count,
            "expiresAt": "2099-01-01T23:59:59Z",
            "dataVersion": version
        })
    }

    pub fn error_response(message: &str) -> Value {
        json!({
            "success": false,
            "error": message
        })
    }
}
