// libs/checkin-cell/src/services/feed.rs
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::FoodBankClient;

use crate::models::{AppointmentListing, AppointmentRecord};
use crate::services::version_guard::ReloadTrigger;

/// Reads the appointments listing. Failures never surface as errors; they read as "no records".
#[derive(Clone)]
pub struct AppointmentFeed {
    client: FoodBankClient,
}

impl AppointmentFeed {
    pub fn new(client: FoodBankClient) -> Self {
        Self { client }
    }

    /// `None` when the listing could not be obtained; callers treat that as zero records.
    pub async fn fetch_records(&self, date: NaiveDate) -> Option<Vec<AppointmentRecord>> {
        let listing = match self.client.list_appointments::<AppointmentListing>(Some(date)).await {
            Ok(listing) => listing,
            Err(e) if e.is_rate_limited() => {
                debug!("Appointments listing rate limited for {}", date);
                return None;
            }
            Err(e) => {
                warn!("Failed to load appointments for {}: {}", date, e);
                return None;
            }
        };

        if listing.success != Some(true) {
            warn!("Appointments listing for {} reported no success", date);
            return None;
        }

        let entries = listing.data.unwrap_or_default();
        let total = entries.len();
        let records: Vec<AppointmentRecord> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();

        if records.len() < total {
            debug!("Dropped {} non-object entries from appointments listing", total - records.len());
        }

        Some(records)
    }

    pub async fn load_records(&self, date: NaiveDate) -> Vec<AppointmentRecord> {
        self.fetch_records(date).await.unwrap_or_default()
    }
}

/// Distinct dates kept before the least recently used one is evicted.
pub const DEFAULT_CACHE_CAPACITY: usize = 8;

struct CachedDay {
    records: Arc<Vec<AppointmentRecord>>,
    last_used: AtomicU64,
}

/// Last fetched record set per service date, bounded by an LRU capacity.
///
/// Only raw records are cached. Every derived number is recomputed per
/// request because classification depends on the current time.
pub struct RecordCache {
    entries: RwLock<HashMap<NaiveDate, CachedDay>>,
    capacity: usize,
    generation: AtomicU64,
    clock: AtomicU64,
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            generation: AtomicU64::new(0),
            clock: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::with_capacity(config.record_cache_capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bumped on every clear; lets a fetch that straddles a reload detect it.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    pub fn get(&self, date: NaiveDate) -> Option<Arc<Vec<AppointmentRecord>>> {
        let entries = self.entries.read().ok()?;
        let day = entries.get(&date)?;
        day.last_used.store(self.tick(), Ordering::Relaxed);
        Some(Arc::clone(&day.records))
    }

    /// Store records fetched under `generation`. Returns `false` when a reload
    /// happened in between, in which case nothing is stored.
    pub fn insert(
        &self,
        date: NaiveDate,
        records: Arc<Vec<AppointmentRecord>>,
        generation: u64,
    ) -> bool {
        let mut entries = match self.entries.write() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };

        if self.generation() != generation {
            debug!("Discarding records for {} fetched before a reload", date);
            return false;
        }

        if !entries.contains_key(&date) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, day)| day.last_used.load(Ordering::Relaxed))
                .map(|(date, _)| *date);
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                debug!("Evicted cached records for {}", oldest);
            }
        }

        let day = CachedDay {
            records,
            last_used: AtomicU64::new(self.tick()),
        };
        entries.insert(date, day);
        true
    }

    pub fn clear(&self) {
        let mut entries = match self.entries.write() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReloadTrigger for RecordCache {
    fn reload(&self, previous: &str, current: &str) {
        let dropped = self.len();
        self.clear();
        info!(
            "Dataset replaced ({} -> {}), discarded {} cached record sets",
            previous, current, dropped
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    #[test]
    fn test_reload_discards_every_entry() {
        let cache = RecordCache::new();
        let generation = cache.generation();
        assert!(cache.insert(date(), Arc::new(vec![AppointmentRecord::default()]), generation));
        assert!(cache.get(date()).is_some());

        cache.reload("v1", "v2");

        assert!(cache.is_empty());
        assert!(cache.get(date()).is_none());
    }

    #[test]
    fn test_insert_after_reload_is_rejected() {
        let cache = RecordCache::new();
        let generation = cache.generation();

        cache.reload("v1", "v2");

        assert!(!cache.insert(date(), Arc::new(Vec::new()), generation));
        assert!(cache.get(date()).is_none());
    }

    #[test]
    fn test_cache_capacity_from_config() {
        let config = AppConfig {
            record_cache_capacity: 0,
            ..AppConfig::default()
        };
        assert_eq!(RecordCache::from_config(&config).capacity(), 1);
        assert_eq!(RecordCache::new().capacity(), DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn test_cache_is_bounded_and_evicts_least_recently_used() {
        let cache = RecordCache::with_capacity(3);
        let generation = cache.generation();
        let day = |n: u32| NaiveDate::from_ymd_opt(2024, 3, n).unwrap();

        for n in 1..=3 {
            assert!(cache.insert(day(n), Arc::new(Vec::new()), generation));
        }
        assert!(cache.get(day(1)).is_some());

        for n in 4..=1000 {
            cache.insert(day(n % 28 + 1), Arc::new(Vec::new()), generation);
            assert!(cache.len() <= 3);
        }

        let cache = RecordCache::with_capacity(2);
        cache.insert(day(1), Arc::new(Vec::new()), generation);
        cache.insert(day(2), Arc::new(Vec::new()), generation);
        cache.get(day(1));
        cache.insert(day(3), Arc::new(Vec::new()), generation);

        assert_eq!(cache.len(), 2);
        assert!(cache.get(day(1)).is_some());
        assert!(cache.get(day(2)).is_none());
        assert!(cache.get(day(3)).is_some());
    }
}
