//! Transient, stacking, auto-dismissing notifications.
//!
//! Every entry owns a timer task that removes it once its display time is
//! up. Manual dismissal aborts that task, so an entry is removed at most once
//! and removing an absent entry is a no-op. The number of regular entries is
//! capped: the oldest is folded into a single "+N more" summary entry when a
//! new one would exceed the cap. Routine entries are folded before new-alert
//! banners, and the summary lives as long as the longest entry it holds.
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::Notifications;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Success,
    Error,
    Info,
    NewAlert,
    /// The "+N more" summary.
    Overflow,
}

impl NotificationKind {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationKind::Success => "success",
            NotificationKind::Error => "error",
            NotificationKind::Info => "info",
            NotificationKind::NewAlert => "new alert",
            NotificationKind::Overflow => "more",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
    pub auto_dismiss_after: Duration,
}

/// Render callback. `show` with an id already on screen updates it in place.
pub trait NotificationPresenter: Send + Sync {
    fn show(&self, notification: &Notification);
    fn remove(&self, id: u64);
}

/// Audible cue for new-alert banners.
pub trait Chime: Send + Sync {
    fn play(&self) -> anyhow::Result<()>;
}

pub fn new_alert_message(count: u64) -> String {
    if count == 1 {
        "1 new alert detected!".to_string()
    } else {
        format!("{} new alerts detected!", count)
    }
}

enum PresenterOp {
    Show(Notification),
    Remove(u64),
}

/// Pending auto-removal. `generation` tells a live timer from one that was
/// replaced after it had already woken up.
struct Timer {
    handle: JoinHandle<()>,
    deadline: Instant,
    generation: u64,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    next_generation: u64,
    entries: VecDeque<Notification>,
    summary: Option<(Notification, usize)>,
    timers: HashMap<u64, Timer>,
}

impl Inner {
    fn alloc_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Abort the timer of `id`, returning the time it had left.
    fn cancel_timer(&mut self, id: u64) -> Duration {
        match self.timers.remove(&id) {
            Some(timer) => {
                timer.handle.abort();
                timer.deadline.saturating_duration_since(Instant::now())
            }
            None => Duration::ZERO,
        }
    }

    /// Oldest routine entry, or the oldest banner when only banners are shown.
    fn eviction_index(&self) -> Option<usize> {
        self.entries
            .iter()
            .position(|n| n.kind != NotificationKind::NewAlert)
            .or_else(|| (!self.entries.is_empty()).then_some(0))
    }
}

#[derive(Clone)]
pub struct NotificationCenter {
    inner: Arc<Mutex<Inner>>,
    presenter: Arc<dyn NotificationPresenter>,
    chime: Option<Arc<dyn Chime>>,
    settings: Notifications,
}

impl NotificationCenter {
    pub fn new(
        settings: Notifications,
        presenter: Arc<dyn NotificationPresenter>,
        chime: Option<Arc<dyn Chime>>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            presenter,
            chime,
            settings,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn duration_for(&self, kind: NotificationKind) -> Duration {
        match kind {
            NotificationKind::NewAlert => self.settings.new_alert_dismiss(),
            _ => self.settings.routine_dismiss(),
        }
    }

    /// Append an entry and schedule its removal. Must run inside a tokio runtime.
    pub fn notify(&self, message: impl Into<String>, kind: NotificationKind) -> u64 {
        let message = message.into();
        let after = self.duration_for(kind);
        let mut ops = Vec::new();
        let id = {
            let mut inner = self.lock();
            while inner.entries.len() >= self.settings.max_visible {
                let index = inner.eviction_index();
                let Some(evicted) = index.and_then(|i| inner.entries.remove(i)) else {
                    break;
                };
                let left = inner.cancel_timer(evicted.id);
                ops.push(PresenterOp::Remove(evicted.id));
                ops.push(PresenterOp::Show(self.bump_summary(&mut inner, left)));
            }

            let id = inner.alloc_id();
            let entry = Notification {
                id,
                message,
                kind,
                created_at: Utc::now(),
                auto_dismiss_after: after,
            };
            inner.entries.push_back(entry.clone());
            self.schedule(&mut inner, id, after);
            ops.push(PresenterOp::Show(entry));
            id
        };
        self.apply(ops);
        debug!(id, kind = kind.label(), "notification shown");
        id
    }

    /// Raise the new-alert banner and ring the chime.
    pub fn new_alerts(&self, count: u64) -> u64 {
        let id = self.notify(new_alert_message(count), NotificationKind::NewAlert);
        info!(count, "new alerts detected");
        if let Some(chime) = &self.chime {
            if let Err(err) = chime.play() {
                debug!(?err, "notification chime unavailable");
            }
        }
        id
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.notify(message, NotificationKind::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.notify(message, NotificationKind::Error)
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.notify(message, NotificationKind::Info)
    }

    /// User dismissal. Returns false when the entry was already gone.
    pub fn dismiss(&self, id: u64) -> bool {
        let removed = {
            let mut inner = self.lock();
            inner.cancel_timer(id);
            Self::take_entry(&mut inner, id)
        };
        if removed {
            self.presenter.remove(id);
        }
        removed
    }

    /// Entries currently on screen, oldest first, summary last.
    pub fn active(&self) -> Vec<Notification> {
        let inner = self.lock();
        let mut out: Vec<_> = inner.entries.iter().cloned().collect();
        if let Some((summary, _)) = &inner.summary {
            out.push(summary.clone());
        }
        out
    }

    pub fn is_active(&self, id: u64) -> bool {
        let inner = self.lock();
        inner.entries.iter().any(|n| n.id == id)
            || inner.summary.as_ref().is_some_and(|(s, _)| s.id == id)
    }

    /// Number of entries folded into the summary so far.
    pub fn overflow_count(&self) -> usize {
        self.lock().summary.as_ref().map_or(0, |(_, n)| *n)
    }

    /// Drop every entry and cancel every timer.
    pub fn clear(&self) {
        let ids: Vec<u64> = {
            let mut inner = self.lock();
            for (_, timer) in inner.timers.drain() {
                timer.handle.abort();
            }
            let mut ids: Vec<u64> = inner.entries.drain(..).map(|n| n.id).collect();
            if let Some((summary, _)) = inner.summary.take() {
                ids.push(summary.id);
            }
            ids
        };
        for id in ids {
            self.presenter.remove(id);
        }
    }

    fn expire(&self, id: u64, generation: u64) {
        let removed = {
            let mut inner = self.lock();
            if inner.timers.get(&id).map(|t| t.generation) != Some(generation) {
                debug!(id, generation, "ignoring superseded timer");
                return;
            }
            // The running timer is this task; just forget its handle.
            inner.timers.remove(&id);
            Self::take_entry(&mut inner, id)
        };
        if removed {
            debug!(id, "notification expired");
            self.presenter.remove(id);
        }
    }

    fn take_entry(inner: &mut Inner, id: u64) -> bool {
        if let Some(pos) = inner.entries.iter().position(|n| n.id == id) {
            inner.entries.remove(pos);
            return true;
        }
        if inner.summary.as_ref().is_some_and(|(s, _)| s.id == id) {
            inner.summary = None;
            return true;
        }
        false
    }

    /// Fold one more evicted entry (with `evicted_left` still to live) into
    /// the summary.
    fn bump_summary(&self, inner: &mut Inner, evicted_left: Duration) -> Notification {
        let (id, count, held_left) = match inner.summary.take() {
            Some((existing, n)) => {
                let left = inner.cancel_timer(existing.id);
                (existing.id, n + 1, left)
            }
            None => (inner.alloc_id(), 1, Duration::ZERO),
        };
        let after = self
            .settings
            .routine_dismiss()
            .max(evicted_left)
            .max(held_left);
        let summary = Notification {
            id,
            message: format!("+{} more", count),
            kind: NotificationKind::Overflow,
            created_at: Utc::now(),
            auto_dismiss_after: after,
        };
        inner.summary = Some((summary.clone(), count));
        self.schedule(inner, id, after);
        summary
    }

    fn schedule(&self, inner: &mut Inner, id: u64, after: Duration) {
        inner.next_generation += 1;
        let generation = inner.next_generation;
        let center = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            center.expire(id, generation);
        });
        inner.timers.insert(
            id,
            Timer {
                handle,
                deadline: Instant::now() + after,
                generation,
            },
        );
    }

    fn apply(&self, ops: Vec<PresenterOp>) {
        for op in ops {
            match op {
                PresenterOp::Show(n) => self.presenter.show(&n),
                PresenterOp::Remove(id) => self.presenter.remove(id),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingPresenter {
        shown: Mutex<Vec<u64>>,
        removed: Mutex<Vec<u64>>,
    }

    impl NotificationPresenter for RecordingPresenter {
        fn show(&self, n: &Notification) {
            self.shown.lock().unwrap().push(n.id);
        }
        fn remove(&self, id: u64) {
            self.removed.lock().unwrap().push(id);
        }
    }

    struct BrokenChime(AtomicUsize);

    impl Chime for BrokenChime {
        fn play(&self) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("no audio device")
        }
    }

    fn center(max_visible: usize) -> (NotificationCenter, Arc<RecordingPresenter>) {
        let presenter = Arc::new(RecordingPresenter::default());
        let settings = Notifications {
            max_visible,
            ..Notifications::default()
        };
        (
            NotificationCenter::new(settings, presenter.clone(), None),
            presenter,
        )
    }

    async fn settle(d: Duration) {
        tokio::time::sleep(d).await;
        tokio::task::yield_now().await;
    }

    #[test]
    fn new_alert_message_pluralizes() {
        assert_eq!(new_alert_message(1), "1 new alert detected!");
        assert_eq!(new_alert_message(3), "3 new alerts detected!");
    }

    #[tokio::test(start_paused = true)]
    async fn routine_notice_expires_after_three_seconds() {
        let (center, presenter) = center(5);
        let id = center.success("Alert archived successfully");

        settle(Duration::from_millis(2_900)).await;
        assert!(center.is_active(id));

        settle(Duration::from_millis(200)).await;
        assert!(!center.is_active(id));
        assert_eq!(*presenter.removed.lock().unwrap(), vec![id]);
    }

    #[tokio::test(start_paused = true)]
    async fn new_alert_banner_persists_longer() {
        let (center, _) = center(5);
        let id = center.new_alerts(2);
        let entry = center.active().pop().unwrap();
        assert_eq!(entry.message, "2 new alerts detected!");
        assert_eq!(entry.auto_dismiss_after, Duration::from_secs(30));

        settle(Duration::from_secs(10)).await;
        assert!(center.is_active(id));
        settle(Duration::from_secs(21)).await;
        assert!(!center.is_active(id));
    }

    #[tokio::test(start_paused = true)]
    async fn manual_dismiss_cancels_timer() {
        let (center, presenter) = center(5);
        let id = center.error("Failed to archive alert: locked");

        assert!(center.dismiss(id));
        assert!(!center.dismiss(id));

        settle(Duration::from_secs(5)).await;
        assert_eq!(*presenter.removed.lock().unwrap(), vec![id]);
        assert!(center.active().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn overflow_coalesces_into_summary() {
        let (center, presenter) = center(2);
        let a = center.info("a");
        let b = center.info("b");
        let c = center.info("c");
        let d = center.info("d");

        let active = center.active();
        let ids: Vec<u64> = active.iter().map(|n| n.id).collect();
        assert_eq!(&ids[..2], &[c, d]);
        assert_eq!(active[2].kind, NotificationKind::Overflow);
        assert_eq!(active[2].message, "+2 more");
        assert_eq!(center.overflow_count(), 2);
        assert!(!center.is_active(a));
        assert!(!center.is_active(b));
        assert!(presenter.removed.lock().unwrap().contains(&a));

        settle(Duration::from_millis(3_100)).await;
        assert!(center.active().is_empty());
        assert_eq!(center.overflow_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn banner_outlives_routine_overflow() {
        let (center, _) = center(5);
        let banner = center.new_alerts(3);
        for i in 0..5 {
            center.success(format!("archived {}", i));
        }

        assert!(center.is_active(banner));
        assert_eq!(center.overflow_count(), 1);
        let kinds: Vec<_> = center.active().iter().map(|n| n.kind).collect();
        assert_eq!(kinds[0], NotificationKind::NewAlert);

        settle(Duration::from_secs(4)).await;
        assert!(center.is_active(banner));
        assert_eq!(center.active().len(), 1);

        settle(Duration::from_secs(27)).await;
        assert!(!center.is_active(banner));
    }

    #[tokio::test(start_paused = true)]
    async fn folded_banner_keeps_its_remaining_time() {
        let (center, _) = center(2);
        center.new_alerts(1);
        settle(Duration::from_secs(10)).await;
        center.new_alerts(2);
        center.new_alerts(3);

        let summary = center.active().pop().unwrap();
        assert_eq!(summary.kind, NotificationKind::Overflow);
        assert_eq!(summary.auto_dismiss_after, Duration::from_secs(20));

        settle(Duration::from_secs(19)).await;
        assert!(center.is_active(summary.id));
        settle(Duration::from_secs(2)).await;
        assert!(!center.is_active(summary.id));
    }

    #[tokio::test(start_paused = true)]
    async fn late_timer_from_previous_bump_is_ignored() {
        let (center, presenter) = center(1);
        center.info("a");
        center.info("b");
        let summary = center.active().pop().unwrap().id;
        let first_generation = center.lock().timers[&summary].generation;

        center.info("c");
        // A wake-up from the replaced timer must not remove the bumped summary.
        center.expire(summary, first_generation);

        assert!(center.is_active(summary));
        assert_eq!(center.overflow_count(), 2);
        assert!(!presenter.removed.lock().unwrap().contains(&summary));
    }

    #[tokio::test(start_paused = true)]
    async fn chime_failure_is_swallowed() {
        let presenter = Arc::new(RecordingPresenter::default());
        let chime = Arc::new(BrokenChime(AtomicUsize::new(0)));
        let center =
            NotificationCenter::new(Notifications::default(), presenter, Some(chime.clone()));
        let id = center.new_alerts(1);
        assert!(center.is_active(id));
        assert_eq!(chime.0.load(Ordering::SeqCst), 1);

        // routine notices stay silent
        center.success("ok");
        assert_eq!(chime.0.load(Ordering::SeqCst), 1);
    }
}
