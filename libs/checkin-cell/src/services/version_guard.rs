// libs/checkin-cell/src/services/version_guard.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use shared_config::AppConfig;
use shared_database::FoodBankClient;
use shared_models::error::ApiError;

use crate::models::DailyStatus;
use crate::services::version_store::VersionStore;

/// Where the guard reads the server's current daily status from.
#[async_trait]
pub trait DailyStatusSource: Send + Sync {
    async fn fetch_daily_status(&self) -> Result<DailyStatus, ApiError>;
}

#[async_trait]
impl DailyStatusSource for FoodBankClient {
    async fn fetch_daily_status(&self) -> Result<DailyStatus, ApiError> {
        self.daily_status().await
    }
}

/// Invoked when the server dataset was replaced. Implementations must drop
/// everything derived from the old dataset.
pub trait ReloadTrigger: Send + Sync {
    fn reload(&self, previous: &str, current: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Server token matches the persisted one.
    Unchanged,
    /// Nothing was persisted yet; the token is now stored and no reload fired.
    FirstSeen(String),
    Reloaded { previous: String, current: String },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Hidden,
    InFlight,
    Disposed,
    RateLimited,
    FetchFailed,
    NoVersion,
    StorageFailed,
}

#[derive(Debug, Clone, Copy)]
pub struct GuardConfig {
    pub poll_interval: Duration,
    pub fetch_timeout: Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

impl GuardConfig {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.version_poll_interval_seconds.max(1)),
            fetch_timeout: Duration::from_secs(config.request_timeout_seconds.max(1)),
        }
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Watches the server data version and forces a full reload when it changes.
pub struct DataVersionGuard {
    source: Arc<dyn DailyStatusSource>,
    store: Arc<dyn VersionStore>,
    reload: Arc<dyn ReloadTrigger>,
    config: GuardConfig,
    in_flight: AtomicBool,
    disposed: AtomicBool,
    visibility: watch::Sender<bool>,
    shutdown: Notify,
}

impl DataVersionGuard {
    pub fn new(
        source: Arc<dyn DailyStatusSource>,
        store: Arc<dyn VersionStore>,
        reload: Arc<dyn ReloadTrigger>,
        config: GuardConfig,
    ) -> Self {
        let (visibility, _) = watch::channel(true);

        Self {
            source,
            store,
            reload,
            config,
            in_flight: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            visibility,
            shutdown: Notify::new(),
        }
    }

    pub fn is_visible(&self) -> bool {
        *self.visibility.borrow()
    }

    /// Hidden views do not poll. Becoming visible triggers an immediate check.
    pub fn set_visible(&self, visible: bool) {
        let previous = self.visibility.send_replace(visible);
        if previous != visible {
            debug!("Data version polling {}", if visible { "resumed" } else { "suspended" });
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// The locally persisted token, if any.
    pub fn persisted_version(&self) -> Option<String> {
        self.store.load().unwrap_or_else(|e| {
            warn!("Failed to read persisted data version: {}", e);
            None
        })
    }

    /// One fetch-and-compare cycle.
    #[instrument(skip(self))]
    pub async fn poll_once(&self) -> PollOutcome {
        if self.is_disposed() {
            return PollOutcome::Skipped(SkipReason::Disposed);
        }
        if !self.is_visible() {
            return PollOutcome::Skipped(SkipReason::Hidden);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Previous data version check still running, skipping tick");
            return PollOutcome::Skipped(SkipReason::InFlight);
        }
        let _in_flight = InFlight(&self.in_flight);

        let fetched = timeout(self.config.fetch_timeout, self.source.fetch_daily_status()).await;

        if self.is_disposed() {
            debug!("Data version check finished after teardown, ignoring result");
            return PollOutcome::Skipped(SkipReason::Disposed);
        }

        let status = match fetched {
            Ok(Ok(status)) => status,
            Ok(Err(e)) if e.is_rate_limited() => {
                debug!("Daily status rate limited, skipping cycle");
                return PollOutcome::Skipped(SkipReason::RateLimited);
            }
            Ok(Err(e)) => {
                warn!("Daily status check failed: {}", e);
                return PollOutcome::Skipped(SkipReason::FetchFailed);
            }
            Err(_) => {
                warn!(
                    "Daily status check timed out after {}ms",
                    self.config.fetch_timeout.as_millis()
                );
                return PollOutcome::Skipped(SkipReason::FetchFailed);
            }
        };

        match status.data_version {
            Some(current) if status.success != Some(false) => self.apply_version(current),
            _ => {
                debug!("Daily status carried no data version");
                PollOutcome::Skipped(SkipReason::NoVersion)
            }
        }
    }

    fn apply_version(&self, current: String) -> PollOutcome {
        match self.persisted_version() {
            Some(previous) if previous == current => PollOutcome::Unchanged,
            Some(previous) => {
                if let Err(e) = self.store.save(&current) {
                    warn!("Failed to persist data version {}: {}", current, e);
                    return PollOutcome::Skipped(SkipReason::StorageFailed);
                }

                info!("Data version changed {} -> {}, reloading", previous, current);
                self.reload.reload(&previous, &current);
                PollOutcome::Reloaded { previous, current }
            }
            None => {
                if let Err(e) = self.store.save(&current) {
                    warn!("Failed to persist data version {}: {}", current, e);
                    return PollOutcome::Skipped(SkipReason::StorageFailed);
                }

                info!("Recorded initial data version {}", current);
                PollOutcome::FirstSeen(current)
            }
        }
    }

    /// Poll on the configured interval until [`stop`](Self::stop) is called.
    ///
    /// Every cycle re-arms regardless of its outcome.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut visibility = self.visibility.subscribe();

        info!(
            "Data version guard started, polling every {}s",
            self.config.poll_interval.as_secs_f32()
        );

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => break,
                _ = ticker.tick() => {}
                changed = visibility.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if !*visibility.borrow_and_update() {
                        continue;
                    }
                    ticker.reset();
                }
            }

            if self.is_disposed() {
                break;
            }

            let outcome = self.poll_once().await;
            debug!("Data version poll outcome: {:?}", outcome);
        }

        info!("Data version guard stopped");
    }

    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let guard = Arc::clone(self);
        tokio::spawn(guard.run())
    }

    /// Stop polling. A fetch still outstanding completes as a no-op.
    pub fn stop(&self) {
        self.disposed.store(true, Ordering::Release);
        self.shutdown.notify_one();
    }
}
