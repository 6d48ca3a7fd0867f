// libs/checkin-cell/src/services/status_classifier.rs
use chrono::{DateTime, Duration, TimeZone, Utc};

use shared_config::AppConfig;

use crate::error::CheckinError;
use crate::models::{DisplayState, RawStatus};

/// Elapsed-time thresholds for escalating still-open appointments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationPolicy {
    pub late_after: Duration,
    pub missed_after: Duration,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            late_after: Duration::hours(1),
            missed_after: Duration::hours(4),
        }
    }
}

impl EscalationPolicy {
    /// Both thresholds must be positive, representable, and strictly ordered.
    pub fn from_config(config: &AppConfig) -> Result<Self, CheckinError> {
        let invalid = || CheckinError::InvalidThresholds {
            late_minutes: config.late_after_minutes,
            missed_minutes: config.missed_after_minutes,
        };

        if config.late_after_minutes <= 0 || config.late_after_minutes >= config.missed_after_minutes {
            return Err(invalid());
        }

        let late_after = Duration::try_minutes(config.late_after_minutes).ok_or_else(invalid)?;
        let missed_after = Duration::try_minutes(config.missed_after_minutes).ok_or_else(invalid)?;

        Ok(Self {
            late_after,
            missed_after,
        })
    }
}

pub struct StatusClassifier {
    policy: EscalationPolicy,
}

impl StatusClassifier {
    pub fn new(policy: EscalationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> EscalationPolicy {
        self.policy
    }

    /// Map a raw status plus appointment time to exactly one display state.
    ///
    /// Open appointments escalate on elapsed time alone: at or past `missed_after`
    /// they are `Missed`, at or past `late_after` they are `Late`, otherwise
    /// (including future appointments) `Pending`. Unknown codes group with
    /// `Cancelled`.
    pub fn classify<Tz: TimeZone>(
        &self,
        status: &RawStatus,
        scheduled_at: &DateTime<Tz>,
        now: DateTime<Utc>,
    ) -> DisplayState {
        match status {
            RawStatus::CheckedIn | RawStatus::Completed => DisplayState::Completed,
            RawStatus::NoShow | RawStatus::Missed => DisplayState::Missed,
            RawStatus::Cancelled | RawStatus::Unknown(_) => DisplayState::Cancelled,
            RawStatus::Scheduled | RawStatus::Pending => {
                let elapsed = now - scheduled_at.with_timezone(&Utc);

                if elapsed >= self.policy.missed_after {
                    DisplayState::Missed
                } else if elapsed >= self.policy.late_after {
                    DisplayState::Late
                } else {
                    DisplayState::Pending
                }
            }
        }
    }
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self::new(EscalationPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 15, 0, 0).unwrap()
    }

    fn open_at(offset: Duration) -> DisplayState {
        StatusClassifier::default().classify(&RawStatus::Scheduled, &(now() - offset), now())
    }

    #[test]
    fn test_terminal_codes_ignore_time() {
        let classifier = StatusClassifier::default();
        let long_ago = now() - Duration::days(3);

        assert_eq!(classifier.classify(&RawStatus::CheckedIn, &long_ago, now()), DisplayState::Completed);
        assert_eq!(classifier.classify(&RawStatus::Completed, &long_ago, now()), DisplayState::Completed);
        assert_eq!(classifier.classify(&RawStatus::NoShow, &now(), now()), DisplayState::Missed);
        assert_eq!(classifier.classify(&RawStatus::Missed, &now(), now()), DisplayState::Missed);
        assert_eq!(classifier.classify(&RawStatus::Cancelled, &now(), now()), DisplayState::Cancelled);
    }

    #[test]
    fn test_unknown_status_groups_with_cancelled() {
        let classifier = StatusClassifier::default();
        let status = RawStatus::parse("on_hold");
        assert_eq!(classifier.classify(&status, &now(), now()), DisplayState::Cancelled);
    }

    #[test]
    fn test_late_boundary_is_inclusive_at_one_hour() {
        assert_eq!(open_at(Duration::minutes(59) + Duration::seconds(59)), DisplayState::Pending);
        assert_eq!(open_at(Duration::hours(1)), DisplayState::Late);
        assert_eq!(open_at(Duration::hours(1) + Duration::seconds(1)), DisplayState::Late);
    }

    #[test]
    fn test_missed_boundary_is_inclusive_at_four_hours() {
        assert_eq!(open_at(Duration::hours(4) - Duration::seconds(1)), DisplayState::Late);
        assert_eq!(open_at(Duration::hours(4)), DisplayState::Missed);
        assert_eq!(open_at(Duration::hours(30)), DisplayState::Missed);
    }

    #[test]
    fn test_future_appointment_is_pending() {
        assert_eq!(open_at(Duration::hours(-2)), DisplayState::Pending);
    }

    #[test]
    fn test_reclassifies_when_now_advances() {
        let classifier = StatusClassifier::default();
        let scheduled = now();

        assert_eq!(classifier.classify(&RawStatus::Pending, &scheduled, now()), DisplayState::Pending);
        assert_eq!(
            classifier.classify(&RawStatus::Pending, &scheduled, now() + Duration::minutes(65)),
            DisplayState::Late
        );
        assert_eq!(
            classifier.classify(&RawStatus::Pending, &scheduled, now() + Duration::hours(5)),
            DisplayState::Missed
        );
    }

    #[test]
    fn test_policy_from_config_rejects_inverted_thresholds() {
        let config = AppConfig {
            late_after_minutes: 300,
            missed_after_minutes: 240,
            ..AppConfig::default()
        };
        assert!(EscalationPolicy::from_config(&config).is_err());

        let policy = EscalationPolicy::from_config(&AppConfig::default()).unwrap();
        assert_eq!(policy, EscalationPolicy::default());
    }

    #[test]
    fn test_policy_from_config_rejects_non_positive_thresholds() {
        for late in [0, -30] {
            let config = AppConfig {
                late_after_minutes: late,
                ..AppConfig::default()
            };
            assert!(matches!(
                EscalationPolicy::from_config(&config),
                Err(CheckinError::InvalidThresholds { .. })
            ));
        }
    }

    #[test]
    fn test_policy_from_config_rejects_unrepresentable_thresholds() {
        let config = AppConfig {
            missed_after_minutes: i64::MAX,
            ..AppConfig::default()
        };

        assert!(matches!(
            EscalationPolicy::from_config(&config),
            Err(CheckinError::InvalidThresholds { missed_minutes: i64::MAX, .. })
        ));
    }
}
