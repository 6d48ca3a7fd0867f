// libs/checkin-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ==============================================================================
// UPSTREAM RECORD MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{}", n),
            RecordId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Full timestamp as exported upstream: epoch milliseconds or a date-time string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    EpochMillis(i64),
    Text(String),
}

/// One appointment/check-in row as returned by the listing endpoint.
///
/// Every field is optional and tolerant of wrong JSON types: a field that does
/// not deserialize becomes `None` instead of rejecting the whole record.
/// Time fields are tried in declaration order, see [`crate::services::DateResolver`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRecord {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,

    #[serde(
        default,
        alias = "client_name",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_name: Option<String>,

    /// Raw status code, kept verbatim. See [`RawStatus::parse`].
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(
        default,
        alias = "appointment_timestamp",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub appointment_timestamp: Option<RawTimestamp>,

    #[serde(
        default,
        alias = "appointment_iso",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub appointment_iso: Option<String>,

    #[serde(
        default,
        alias = "appointment_time",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub appointment_time: Option<String>,
}

impl AppointmentRecord {
    pub fn raw_status(&self) -> RawStatus {
        self.status
            .as_deref()
            .map(RawStatus::parse)
            .unwrap_or_else(|| RawStatus::Unknown(String::new()))
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn version_token<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Raw status vocabulary of the upstream system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawStatus {
    // still open
    Scheduled,
    Pending,
    // fulfilled
    CheckedIn,
    Completed,
    // abandoned
    NoShow,
    Missed,
    Cancelled,
    Unknown(String),
}

impl RawStatus {
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();

        match normalized.as_str() {
            "scheduled" => RawStatus::Scheduled,
            "pending" => RawStatus::Pending,
            "checked_in" | "checkedin" => RawStatus::CheckedIn,
            "completed" => RawStatus::Completed,
            "no_show" | "noshow" => RawStatus::NoShow,
            "missed" => RawStatus::Missed,
            "cancelled" | "canceled" => RawStatus::Cancelled,
            _ => RawStatus::Unknown(raw.to_string()),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, RawStatus::Scheduled | RawStatus::Pending)
    }
}

impl fmt::Display for RawStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawStatus::Scheduled => write!(f, "scheduled"),
            RawStatus::Pending => write!(f, "pending"),
            RawStatus::CheckedIn => write!(f, "checked_in"),
            RawStatus::Completed => write!(f, "completed"),
            RawStatus::NoShow => write!(f, "no_show"),
            RawStatus::Missed => write!(f, "missed"),
            RawStatus::Cancelled => write!(f, "cancelled"),
            RawStatus::Unknown(raw) => write!(f, "unknown({})", raw),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentListing {
    #[serde(default, deserialize_with = "lenient")]
    pub success: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub data: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStatus {
    #[serde(default, deserialize_with = "lenient")]
    pub success: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub has_data: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub record_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "version_token")]
    pub data_version: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub service_date: Option<NaiveDate>,
}

// ==============================================================================
// DERIVED MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayState {
    Completed,
    Pending,
    Late,
    Missed,
    Cancelled,
}

impl DisplayState {
    pub const ALL: [DisplayState; 5] = [
        DisplayState::Completed,
        DisplayState::Pending,
        DisplayState::Late,
        DisplayState::Missed,
        DisplayState::Cancelled,
    ];
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayState::Completed => write!(f, "completed"),
            DisplayState::Pending => write!(f, "pending"),
            DisplayState::Late => write!(f, "late"),
            DisplayState::Missed => write!(f, "missed"),
            DisplayState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A record with its single authoritative appointment time, in service-local time.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedAppointment<'a> {
    pub record: &'a AppointmentRecord,
    pub scheduled_at: DateTime<Tz>,
}

#[derive(Debug, Clone, Copy)]
pub struct ClassifiedAppointment<'a> {
    pub record: &'a AppointmentRecord,
    pub scheduled_at: DateTime<Tz>,
    pub state: DisplayState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCounts {
    pub completed: u32,
    pub pending: u32,
    pub late: u32,
    pub missed: u32,
    pub cancelled: u32,
    pub total: u32,
}

impl StateCounts {
    pub fn record(&mut self, state: DisplayState) {
        match state {
            DisplayState::Completed => self.completed += 1,
            DisplayState::Pending => self.pending += 1,
            DisplayState::Late => self.late += 1,
            DisplayState::Missed => self.missed += 1,
            DisplayState::Cancelled => self.cancelled += 1,
        }
        self.total += 1;
    }

    pub fn get(&self, state: DisplayState) -> u32 {
        match state {
            DisplayState::Completed => self.completed,
            DisplayState::Pending => self.pending,
            DisplayState::Late => self.late,
            DisplayState::Missed => self.missed,
            DisplayState::Cancelled => self.cancelled,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub label: String,
    pub hour: u32,
    pub minute: u32,
    pub counts: StateCounts,
}

/// Output of one aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAggregate {
    pub reference_date: NaiveDate,
    pub slots: Vec<TimeSlot>,
    pub totals: StateCounts,
    /// Records with no parseable time field; excluded from slots and totals.
    pub unresolved: u32,
}

/// Row for the raw client table: the record unaltered plus what the pipeline derived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientRow {
    pub record: AppointmentRecord,
    pub scheduled_at: Option<DateTime<Tz>>,
    pub state: Option<DisplayState>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardQuery {
    pub date: Option<NaiveDate>,
}
