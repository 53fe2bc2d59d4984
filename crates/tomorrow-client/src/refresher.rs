use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use tomorrow_core::dashboard::{DashboardSnapshot, DashboardStats, SystemStatus};
use tomorrow_core::time::unix_millis;

use crate::api::ApiClient;
use crate::error::ApiError;

/// Error shown when neither dashboard resource could be fetched.
pub const BACKEND_UNREACHABLE: &str = "Cannot connect to the backend API";

/// The two resources the dashboard polls.
pub trait DashboardSource: Send + Sync + 'static {
    fn fetch_stats(&self) -> impl Future<Output = Result<DashboardStats, ApiError>> + Send;

    fn fetch_system_status(&self) -> impl Future<Output = Result<SystemStatus, ApiError>> + Send;
}

impl DashboardSource for ApiClient {
    fn fetch_stats(&self) -> impl Future<Output = Result<DashboardStats, ApiError>> + Send {
        self.fetch_dashboard_stats()
    }

    fn fetch_system_status(&self) -> impl Future<Output = Result<SystemStatus, ApiError>> + Send {
        ApiClient::fetch_system_status(self)
    }
}

/// Result of one refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// At least one resource was replaced.
    Updated { stats: bool, system_status: bool },
    /// Both fetches failed; existing data was kept.
    Failed,
    /// A newer cycle started before this one settled; its results were dropped.
    Superseded,
}

/// Merge a settled cycle into the snapshot.
fn merge_cycle(
    snapshot: &mut DashboardSnapshot,
    stats: Result<DashboardStats, ApiError>,
    system_status: Result<SystemStatus, ApiError>,
    now_millis: u64,
) -> RefreshOutcome {
    snapshot.loading = false;

    let got_stats = match stats {
        Ok(stats) => {
            snapshot.stats = Some(stats);
            true
        },
        Err(_) => false,
    };
    let got_status = match system_status {
        Ok(status) => {
            snapshot.system_status = Some(status);
            true
        },
        Err(_) => false,
    };

    if !got_stats && !got_status {
        snapshot.error = Some(BACKEND_UNREACHABLE.to_string());
        return RefreshOutcome::Failed;
    }
    snapshot.last_updated = Some(now_millis);
    RefreshOutcome::Updated {
        stats: got_stats,
        system_status: got_status,
    }
}

/// Keeps a [`DashboardSnapshot`] fresh by polling a [`DashboardSource`].
pub struct DashboardRefresher<S> {
    source: S,
    state: watch::Sender<DashboardSnapshot>,
}

impl<S: DashboardSource> DashboardRefresher<S> {
    pub fn new(source: S) -> Self {
        let (state, _) = watch::channel(DashboardSnapshot::default());
        Self { source, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.state.borrow().clone()
    }

    /// Run one refresh cycle: fetch stats and system status concurrently,
    /// wait for both, and merge whatever succeeded. Existing data stays
    /// visible while the cycle is in flight.
    pub async fn load_data(&self) -> RefreshOutcome {
        let mut cycle = 0;
        self.state.send_modify(|s| {
            s.cycle += 1;
            cycle = s.cycle;
            s.loading = true;
            s.error = None;
        });

        let (stats, system_status) = tokio::join!(
            self.source.fetch_stats(),
            self.source.fetch_system_status()
        );
        if let Err(e) = &stats {
            tracing::warn!(cycle, error = %e, "Failed to fetch dashboard stats");
        }
        if let Err(e) = &system_status {
            tracing::warn!(cycle, error = %e, "Failed to fetch system status");
        }

        let mut outcome = RefreshOutcome::Superseded;
        self.state.send_if_modified(|s| {
            if s.cycle != cycle {
                return false;
            }
            outcome = merge_cycle(s, stats, system_status, unix_millis());
            true
        });

        match outcome {
            RefreshOutcome::Updated { .. } => tracing::debug!(cycle, ?outcome, "Dashboard refreshed"),
            RefreshOutcome::Failed => tracing::warn!(cycle, "{BACKEND_UNREACHABLE}"),
            RefreshOutcome::Superseded => {
                tracing::debug!(cycle, "Discarding results of superseded refresh cycle")
            },
        }
        outcome
    }

    /// Load immediately, then every `period` until the handle is dropped.
    ///
    /// # Panics
    /// If `period` is zero.
    pub fn spawn(self: Arc<Self>, period: Duration) -> RefreshHandle {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.load_data().await;
            }
        });
        RefreshHandle { task }
    }
}

/// Owns the refresh timer. Dropping it stops polling.
#[derive(Debug)]
pub struct RefreshHandle {
    task: JoinHandle<()>,
}

impl RefreshHandle {
    pub fn cancel(self) {
        self.task.abort();
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
