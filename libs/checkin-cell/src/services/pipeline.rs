// libs/checkin-cell/src/services/pipeline.rs
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::debug;

use shared_config::AppConfig;

use crate::error::CheckinError;
use crate::models::{
    AppointmentRecord, ClassifiedAppointment, ClientRow, DayAggregate, ResolvedAppointment,
};
use crate::services::date_resolver::DateResolver;
use crate::services::status_classifier::{EscalationPolicy, StatusClassifier};
use crate::services::time_buckets::TimeBucketAggregator;

/// Records that resolved to a time, and how many did not.
pub struct Resolution<'a> {
    pub resolved: Vec<ResolvedAppointment<'a>>,
    pub unresolved: u32,
}

/// The single shared path from raw records to dashboard numbers.
///
/// Stateless: every call recomputes from the records and `now` it is given,
/// so open appointments escalate as time passes without any refetch.
pub struct CheckinPipeline {
    resolver: DateResolver,
    classifier: StatusClassifier,
    aggregator: TimeBucketAggregator,
}

impl CheckinPipeline {
    pub fn new(
        resolver: DateResolver,
        classifier: StatusClassifier,
        aggregator: TimeBucketAggregator,
    ) -> Self {
        Self {
            resolver,
            classifier,
            aggregator,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, CheckinError> {
        Ok(Self::new(
            DateResolver::from_config(config)?,
            StatusClassifier::new(EscalationPolicy::from_config(config)?),
            TimeBucketAggregator::default(),
        ))
    }

    pub fn timezone(&self) -> Tz {
        self.resolver.timezone()
    }

    /// The service's calendar date at `now`.
    pub fn service_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.resolver.timezone()).date_naive()
    }

    pub fn resolve_all<'a>(
        &self,
        records: &'a [AppointmentRecord],
        reference_date: NaiveDate,
    ) -> Resolution<'a> {
        let mut resolved = Vec::with_capacity(records.len());
        let mut unresolved = 0u32;

        for record in records {
            match self.resolver.resolve(record, reference_date) {
                Some(scheduled_at) => resolved.push(ResolvedAppointment { record, scheduled_at }),
                None => unresolved += 1,
            }
        }

        if unresolved > 0 {
            debug!("{} of {} records have no usable appointment time", unresolved, records.len());
        }

        Resolution { resolved, unresolved }
    }

    pub fn classify_all<'a>(
        &self,
        resolved: &[ResolvedAppointment<'a>],
        now: DateTime<Utc>,
    ) -> Vec<ClassifiedAppointment<'a>> {
        resolved
            .iter()
            .map(|r| ClassifiedAppointment {
                record: r.record,
                scheduled_at: r.scheduled_at,
                state: self
                    .classifier
                    .classify(&r.record.raw_status(), &r.scheduled_at, now),
            })
            .collect()
    }

    /// Resolve, classify and bucket `records` for `reference_date` as of `now`.
    pub fn aggregate(
        &self,
        records: &[AppointmentRecord],
        reference_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> DayAggregate {
        let resolution = self.resolve_all(records, reference_date);
        let classified = self.classify_all(&resolution.resolved, now);
        self.aggregator
            .aggregate(reference_date, &classified, resolution.unresolved)
    }

    /// Every record in input order, with its derived time and state when it has one.
    pub fn client_rows(
        &self,
        records: &[AppointmentRecord],
        reference_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Vec<ClientRow> {
        records
            .iter()
            .map(|record| {
                let scheduled_at = self.resolver.resolve(record, reference_date);
                let state = scheduled_at
                    .as_ref()
                    .map(|at| self.classifier.classify(&record.raw_status(), at, now));

                ClientRow {
                    record: record.clone(),
                    scheduled_at,
                    state,
                }
            })
            .collect()
    }
}

impl Default for CheckinPipeline {
    fn default() -> Self {
        Self::new(
            DateResolver::new(chrono_tz::UTC),
            StatusClassifier::default(),
            TimeBucketAggregator::default(),
        )
    }
}
