// libs/checkin-cell/src/services/dashboard.rs
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::FoodBankClient;

use crate::error::CheckinError;
use crate::models::{AppointmentRecord, ClientRow, DailyStatus, DayAggregate, StateCounts, TimeSlot};
use crate::services::feed::{AppointmentFeed, RecordCache};
use crate::services::pipeline::CheckinPipeline;
use crate::services::version_guard::DailyStatusSource;
use crate::services::version_store::VersionStore;

#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    pub reference_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub totals: StateCounts,
    pub unresolved: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub upstream: DailyStatus,
    pub local_version: Option<String>,
    pub in_sync: bool,
}

/// Backs every dashboard surface with the one shared pipeline.
pub struct DashboardService {
    pipeline: CheckinPipeline,
    feed: AppointmentFeed,
    client: FoodBankClient,
    cache: Arc<RecordCache>,
    store: Arc<dyn VersionStore>,
}

impl DashboardService {
    pub fn new(
        config: &AppConfig,
        cache: Arc<RecordCache>,
        store: Arc<dyn VersionStore>,
    ) -> Result<Self, CheckinError> {
        let client = FoodBankClient::new(config);

        Ok(Self {
            pipeline: CheckinPipeline::from_config(config)?,
            feed: AppointmentFeed::new(client.clone()),
            client,
            cache,
            store,
        })
    }

    pub fn pipeline(&self) -> &CheckinPipeline {
        &self.pipeline
    }

    pub fn cache(&self) -> &Arc<RecordCache> {
        &self.cache
    }

    pub fn reference_date(&self, requested: Option<NaiveDate>, now: DateTime<Utc>) -> NaiveDate {
        requested.unwrap_or_else(|| self.pipeline.service_date(now))
    }

    async fn records_for(&self, date: NaiveDate) -> Arc<Vec<AppointmentRecord>> {
        if let Some(records) = self.cache.get(date) {
            debug!("Serving {} cached records for {}", records.len(), date);
            return records;
        }

        let generation = self.cache.generation();
        match self.feed.fetch_records(date).await {
            Some(records) => {
                let records = Arc::new(records);
                self.cache.insert(date, Arc::clone(&records), generation);
                records
            }
            None => Arc::new(Vec::new()),
        }
    }

    pub async fn aggregate(&self, date: NaiveDate, now: DateTime<Utc>) -> DayAggregate {
        let records = self.records_for(date).await;
        self.pipeline.aggregate(&records, date, now)
    }

    pub async fn summary(&self, date: NaiveDate, now: DateTime<Utc>) -> DaySummary {
        let aggregate = self.aggregate(date, now).await;
        DaySummary {
            reference_date: aggregate.reference_date,
            generated_at: now,
            totals: aggregate.totals,
            unresolved: aggregate.unresolved,
        }
    }

    pub async fn slots(&self, date: NaiveDate, now: DateTime<Utc>) -> Vec<TimeSlot> {
        self.aggregate(date, now).await.slots
    }

    pub async fn client_rows(&self, date: NaiveDate, now: DateTime<Utc>) -> Vec<ClientRow> {
        let records = self.records_for(date).await;
        self.pipeline.client_rows(&records, date, now)
    }

    pub async fn status(&self) -> Result<StatusReport, CheckinError> {
        let upstream = self.client.fetch_daily_status().await?;
        let local_version = self.store.load()?;
        let in_sync = upstream.data_version.is_some() && upstream.data_version == local_version;

        Ok(StatusReport {
            upstream,
            local_version,
            in_sync,
        })
    }
}
