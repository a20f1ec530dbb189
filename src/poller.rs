//! Count-diff alert poller.
//!
//! Every tick reads the total number of active alerts for the current facility
//! filter and compares it with the previous observation. Growth raises one
//! notification carrying the difference and refreshes both lists in place.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::api::{DashboardApi, ListQuery};
use crate::facility::SharedSelection;
use crate::model::ListKind;
use crate::notify::NotificationCenter;
use crate::pagination::ListLoader;

/// Matches the backend's alert-evaluation cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountChange {
    /// No earlier observation; nothing to compare against.
    First,
    Grew(u64),
    Unchanged,
    Shrank,
}

pub fn count_diff(previous: Option<u64>, current: u64) -> CountChange {
    match previous {
        None => CountChange::First,
        Some(prev) if current > prev => CountChange::Grew(current - prev),
        Some(prev) if current == prev => CountChange::Unchanged,
        Some(_) => CountChange::Shrank,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A poll was already in flight.
    Skipped,
    Baseline(u64),
    NewAlerts { delta: u64, total: u64 },
    Quiet(u64),
    /// The filter changed while the request was in flight.
    Discarded,
    Failed,
}

pub struct AlertPoller {
    api: Arc<dyn DashboardApi>,
    selection: SharedSelection,
    active: Arc<ListLoader>,
    archived: Arc<ListLoader>,
    notifications: NotificationCenter,
    interval: Duration,
    busy: AtomicBool,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl AlertPoller {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        selection: SharedSelection,
        active: Arc<ListLoader>,
        archived: Arc<ListLoader>,
        notifications: NotificationCenter,
        interval: Duration,
    ) -> Self {
        Self {
            api,
            selection,
            active,
            archived,
            notifications,
            interval,
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_polling(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// One poll. Skips instead of queueing when another poll is in flight.
    #[instrument(skip_all)]
    pub async fn tick(&self) -> PollOutcome {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("poll already in flight; skipping tick");
            return PollOutcome::Skipped;
        }
        let _guard = BusyGuard(&self.busy);

        let filter = self.selection.lock().await.snapshot();
        let query = ListQuery::new(&filter, 1, 1);
        let total = match self.api.alerts(ListKind::Active, &query).await {
            Ok(page) => match page.total {
                Some(total) => total,
                None => {
                    warn!("active alert response has no total; skipping comparison");
                    return PollOutcome::Failed;
                }
            },
            Err(err) => {
                warn!(%err, "alert poll failed; will retry next tick");
                return PollOutcome::Failed;
            }
        };

        if self.selection.lock().await.generation() != filter.generation() {
            debug!("facility filter changed during poll; discarding count");
            self.active.set_last_known_total(None).await;
            return PollOutcome::Discarded;
        }

        let previous = self.active.last_known_total().await;
        self.active.set_last_known_total(Some(total)).await;
        match count_diff(previous, total) {
            CountChange::First => {
                debug!(total, "recorded alert count baseline");
                PollOutcome::Baseline(total)
            }
            CountChange::Grew(delta) => {
                self.notifications.new_alerts(delta);
                self.active.reload_current().await;
                self.archived.reload_current().await;
                PollOutcome::NewAlerts { delta, total }
            }
            CountChange::Unchanged | CountChange::Shrank => {
                debug!(total, ?previous, "no new alerts");
                PollOutcome::Quiet(total)
            }
        }
    }

    /// Run ticks on a fixed interval until `token` is cancelled. The first
    /// tick fires immediately to establish the baseline.
    pub fn spawn(self: Arc<Self>, token: CancellationToken) -> PollerHandle {
        let child = token.clone();
        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval = ?self.interval, "alert poller started");
            loop {
                tokio::select! {
                    biased;
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        tokio::select! {
                            biased;
                            _ = child.cancelled() => break,
                            _ = self.tick() => {}
                        }
                    }
                }
            }
            info!("alert poller stopped");
        });
        PollerHandle {
            token,
            join: Some(join),
        }
    }
}

/// Owner of a running poller. Dropping it cancels the poller as well.
pub struct PollerHandle {
    token: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Cancel and wait for the poller task to finish.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(join) = self.join.take() {
            if let Err(err) = join.await {
                warn!(?err, "alert poller task ended abnormally");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |j| j.is_finished())
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
