//! Periodic refresh cycle.
//!
//! A cycle fetches every endpoint, derives the metrics and publishes a freshly
//! rendered [`DashboardView`]. Cycles are all-or-nothing: any failure leaves
//! the previously published view in place until the next tick. At most one
//! cycle runs at a time; a tick or manual refresh that finds one in flight is
//! skipped rather than queued.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Local};
use dashboard_metrics::{unix_timestamp, HistoryLog};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::{
    endpoints::{CycleData, EndpointClient},
    error::{DashboardError, Result},
    render::{derive_metrics, render_dashboard, RenderSettings},
    sink::{DashboardView, TracingSink},
    DashboardStore,
};

/// Re-entrancy guard: hands out at most one [`CyclePermit`] at a time.
#[derive(Debug, Default)]
pub struct CycleGuard {
    busy: AtomicBool,
}

/// Held for the duration of a cycle; releases the guard on drop.
#[derive(Debug)]
pub struct CyclePermit<'a> {
    busy: &'a AtomicBool,
}

impl CycleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<CyclePermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CyclePermit { busy: &self.busy })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for CyclePermit<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Summary of a successful cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub refreshed_at: u64,
    pub history_samples: usize,
    pub average_window_hours: f64,
}

fn local_time_string(now: f64) -> String {
    DateTime::from_timestamp(now as i64, 0)
        .map(|utc| {
            utc.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| web_utils::UNAVAILABLE.to_string())
}

const OUTCOME_UNKNOWN: u8 = 0;
const OUTCOME_OK: u8 = 1;
const OUTCOME_FAILED: u8 = 2;

pub struct Poller {
    client: EndpointClient,
    store: Arc<DashboardStore>,
    settings: RenderSettings,
    guard: CycleGuard,
    last_outcome: AtomicU8,
}

impl Poller {
    pub fn new(client: EndpointClient, store: Arc<DashboardStore>, settings: RenderSettings) -> Self {
        Self {
            client,
            store,
            settings,
            guard: CycleGuard::new(),
            last_outcome: AtomicU8::new(OUTCOME_UNKNOWN),
        }
    }

    pub fn guard(&self) -> &CycleGuard {
        &self.guard
    }

    /// Run one cycle now unless another is already in flight.
    pub async fn refresh(&self) -> Result<CycleReport> {
        let _permit = self.guard.try_acquire().ok_or(DashboardError::Busy)?;
        let outcome = self.run_cycle().await;
        self.record_outcome(&outcome);
        outcome
    }

    async fn run_cycle(&self) -> Result<CycleReport> {
        let data = self.client.fetch_cycle().await?;
        let report = self.publish(data, unix_timestamp());
        Ok(report)
    }

    /// Derive, render and publish a cycle's data.
    pub fn publish(&self, data: CycleData, now: f64) -> CycleReport {
        let metrics = derive_metrics(&data, now, &self.settings);
        let refreshed_at = now.max(0.0) as u64;
        let last_refreshed = local_time_string(now);

        debug!(
            "Publishing cycle: {} history samples, latest at {:?}",
            data.history.len(),
            data.history.timestamps.last()
        );

        render_dashboard(
            &mut TracingSink,
            &metrics,
            &data.history,
            now,
            &last_refreshed,
            &self.settings,
        );

        let mut view = DashboardView::new(HistoryLog::default(), refreshed_at);
        render_dashboard(
            &mut view,
            &metrics,
            &data.history,
            now,
            &last_refreshed,
            &self.settings,
        );

        let report = CycleReport {
            refreshed_at,
            history_samples: data.history.len(),
            average_window_hours: metrics.average_window_hours,
        };
        view.history = data.history;
        self.store.publish(view);
        report
    }

    fn record_outcome(&self, outcome: &Result<CycleReport>) {
        let next = if outcome.is_ok() { OUTCOME_OK } else { OUTCOME_FAILED };
        let previous = self.last_outcome.swap(next, Ordering::AcqRel);

        match outcome {
            Ok(report) if previous != OUTCOME_OK => info!(
                "Dashboard refreshed: {} history samples, {:.1}h averaging window",
                report.history_samples, report.average_window_hours
            ),
            Ok(report) => debug!("Dashboard refreshed at {}", report.refreshed_at),
            Err(e) if previous == OUTCOME_FAILED => debug!("Refresh still failing: {}", e),
            Err(e) if e.is_endpoint_failure() => error!("Refresh cycle aborted, endpoint failed: {}", e),
            Err(e) => error!("Refresh cycle aborted, bad endpoint data: {}", e),
        }
    }

    /// Drive cycles on a fixed interval until the task is dropped.
    pub async fn run(self: Arc<Self>, interval: Duration) {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if let Err(DashboardError::Busy) = self.refresh().await {
                warn!("Previous refresh cycle still running, skipping tick");
            }
        }
    }
}
