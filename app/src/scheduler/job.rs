use crate::device::DeviceClient;
use crate::reading::ReadingLog;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, warn, Instrument, Span};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Absent,
    Scheduled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollTarget {
    pub plant_id: String,
    pub device_address: String,
    pub interval: Duration,
    pub sensor_index: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobSnapshot {
    pub plant_id: String,
    pub device_address: String,
    pub interval_secs: u64,
    pub sensor_index: i32,
    pub installed_at: DateTime<Utc>,
    pub firings: u64,
    pub failures: u64,
    pub skipped: u64,
    pub last_success_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct JobStats {
    firings: AtomicU64,
    failures: AtomicU64,
    skipped: AtomicU64,
    last_success_at: Mutex<Option<DateTime<Utc>>>,
}

/// Everything a firing needs besides its target
#[derive(Clone)]
pub(crate) struct PullContext {
    pub client: DeviceClient,
    pub readings: ReadingLog,
}

/// A recurring pull for one plant. Dropping the job cancels it,
/// no firing starts after the drop returns.
pub(crate) struct PollJob {
    target: Arc<PollTarget>,
    installed_at: DateTime<Utc>,
    stats: Arc<JobStats>,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl Drop for PollJob {
    fn drop(&mut self) {
        self.token.cancel();
        self.task.abort();
    }
}

impl PollJob {
    pub fn spawn(target: PollTarget, ctx: PullContext) -> Self {
        let target = Arc::new(target);
        let stats = Arc::new(JobStats::default());
        let token = CancellationToken::new();

        let span = info_span!("poll", plant_id = %target.plant_id);
        let task = tokio::spawn(
            PollJob::run(target.clone(), ctx, stats.clone(), token.clone()).instrument(span),
        );

        PollJob {
            target,
            installed_at: Utc::now(),
            stats,
            token,
            task,
        }
    }

    pub fn target(&self) -> &PollTarget {
        &self.target
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            plant_id: self.target.plant_id.clone(),
            device_address: self.target.device_address.clone(),
            interval_secs: self.target.interval.as_secs(),
            sensor_index: self.target.sensor_index,
            installed_at: self.installed_at,
            firings: self.stats.firings.load(Ordering::Relaxed),
            failures: self.stats.failures.load(Ordering::Relaxed),
            skipped: self.stats.skipped.load(Ordering::Relaxed),
            last_success_at: *self.stats.last_success_at.lock(),
        }
    }

    /*
     * Helpers
     */

    async fn run(
        target: Arc<PollTarget>,
        ctx: PullContext,
        stats: Arc<JobStats>,
        token: CancellationToken,
    ) {
        // first firing one interval after installation
        let mut ticker = tokio::time::interval_at(Instant::now() + target.interval, target.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let in_flight = Arc::new(AtomicBool::new(false));

        debug!(interval = ?target.interval, "Started poll job");
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if in_flight.swap(true, Ordering::AcqRel) {
                stats.skipped.fetch_add(1, Ordering::Relaxed);
                warn!("Previous pull still running, skipping firing");
                continue;
            }

            // every firing runs on its own, a stuck device never delays the timer
            tokio::spawn(
                PollJob::fire(
                    target.clone(),
                    ctx.clone(),
                    stats.clone(),
                    token.clone(),
                    in_flight.clone(),
                )
                .instrument(Span::current()),
            );
        }
        debug!("Ended poll job");
    }

    async fn fire(
        target: Arc<PollTarget>,
        ctx: PullContext,
        stats: Arc<JobStats>,
        token: CancellationToken,
        in_flight: Arc<AtomicBool>,
    ) {
        stats.firings.fetch_add(1, Ordering::Relaxed);
        let pulled = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            res = ctx.client.pull(&target.device_address, &target.plant_id, target.sensor_index) => Some(res),
        };

        match pulled {
            None => debug!("Pull cancelled"),
            Some(Ok(_)) if token.is_cancelled() => debug!("Discarding reading of a removed job"),
            Some(Ok(msg)) => {
                match ctx
                    .readings
                    .append(&target.plant_id, target.sensor_index, msg)
                    .await
                {
                    Ok(_) => *stats.last_success_at.lock() = Some(Utc::now()),
                    Err(e) => {
                        stats.failures.fetch_add(1, Ordering::Relaxed);
                        error!("Failed persisting reading: {}", e);
                    }
                }
            }
            Some(Err(e)) => {
                stats.failures.fetch_add(1, Ordering::Relaxed);
                warn!(address = %target.device_address, "Pull failed: {}", e);
            }
        }
        in_flight.store(false, Ordering::Release);
    }
}
