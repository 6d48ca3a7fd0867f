// libs/checkin-cell/src/services/date_resolver.rs
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use regex::Regex;
use tracing::debug;

use shared_config::AppConfig;

use crate::error::CheckinError;
use crate::models::{AppointmentRecord, RawTimestamp};

const NAIVE_TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn clock_time_regex() -> &'static Regex {
    static CLOCK_TIME_RE: OnceLock<Regex> = OnceLock::new();
    CLOCK_TIME_RE.get_or_init(|| {
        Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").expect("clock time regex should compile")
    })
}

/// Picks the one authoritative appointment time out of a record's time fields.
///
/// Candidates are tried in a fixed order and the first that parses wins:
/// 1. `appointment_timestamp` (epoch millis, RFC 3339, or naive local date-time)
/// 2. `appointment_iso` (RFC 3339 with offset)
/// 3. `appointment_time` (strict `HH:MM`, placed on the reference date)
///
/// A candidate that fails to parse is skipped. `None` means the record is
/// unresolvable; callers exclude it from all counts.
#[derive(Debug, Clone, Copy)]
pub struct DateResolver {
    timezone: Tz,
}

impl DateResolver {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, CheckinError> {
        let timezone = config
            .service_timezone
            .parse::<Tz>()
            .map_err(|_| CheckinError::InvalidTimezone(config.service_timezone.clone()))?;
        Ok(Self::new(timezone))
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn resolve(
        &self,
        record: &AppointmentRecord,
        reference_date: NaiveDate,
    ) -> Option<DateTime<Tz>> {
        let resolved = record
            .appointment_timestamp
            .as_ref()
            .and_then(|raw| self.parse_timestamp(raw))
            .or_else(|| record.appointment_iso.as_deref().and_then(|s| self.parse_iso(s)))
            .or_else(|| {
                record
                    .appointment_time
                    .as_deref()
                    .and_then(|s| self.parse_clock_time(s, reference_date))
            });

        if resolved.is_none() {
            debug!(
                "No parseable appointment time for record {}",
                record.id.as_ref().map(|id| id.to_string()).unwrap_or_else(|| "<no id>".to_string())
            );
        }

        resolved
    }

    fn parse_timestamp(&self, raw: &RawTimestamp) -> Option<DateTime<Tz>> {
        match raw {
            RawTimestamp::EpochMillis(ms) => self.parse_epoch_millis(*ms),
            RawTimestamp::Text(text) => {
                let text = text.trim();
                if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
                    return text.parse::<i64>().ok().and_then(|ms| self.parse_epoch_millis(ms));
                }

                self.parse_iso(text).or_else(|| {
                    NAIVE_TIMESTAMP_FORMATS
                        .iter()
                        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                        .and_then(|naive| self.localize(naive))
                })
            }
        }
    }

    fn parse_epoch_millis(&self, ms: i64) -> Option<DateTime<Tz>> {
        DateTime::from_timestamp_millis(ms).map(|utc| utc.with_timezone(&self.timezone))
    }

    fn parse_iso(&self, text: &str) -> Option<DateTime<Tz>> {
        DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|dt| dt.with_timezone(&self.timezone))
    }

    fn parse_clock_time(&self, text: &str, reference_date: NaiveDate) -> Option<DateTime<Tz>> {
        let captures = clock_time_regex().captures(text.trim())?;
        let hour: u32 = captures[1].parse().ok()?;
        let minute: u32 = captures[2].parse().ok()?;
        let time = NaiveTime::from_hms_opt(hour, minute, 0)?;

        self.localize(reference_date.and_time(time))
    }

    /// Local wall-clock time in the service timezone; the earlier instant wins on DST overlap.
    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
        self.timezone.from_local_datetime(&naive).earliest()
    }
}
