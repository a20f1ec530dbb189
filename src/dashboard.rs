//! Top-level view controller. Owns the application state that the
//! components share and is the single dispatch point for row actions.
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::api::{ApiError, DashboardApi};
use crate::config::Config;
use crate::facility::{FacilitySelection, SharedSelection};
use crate::model::ListKind;
use crate::notify::{Chime, NotificationCenter, NotificationPresenter};
use crate::pagination::{ListLoader, ListView, PageNav, RowAction};
use crate::poller::{AlertPoller, PollOutcome, PollerHandle};
use crate::review::{DetailView, OpenedReview, ReviewLoader};

/// Render callback for the recent-activity feed.
pub trait ActivityView: Send + Sync {
    fn render(&self, activities: &[String]);
}

/// Every render callback the dashboard drives.
#[derive(Clone)]
pub struct Views {
    pub active: Arc<dyn ListView>,
    pub archived: Arc<dyn ListView>,
    pub detail: Arc<dyn DetailView>,
    pub activities: Arc<dyn ActivityView>,
    pub notifications: Arc<dyn NotificationPresenter>,
    pub chime: Option<Arc<dyn Chime>>,
}

pub struct Dashboard {
    api: Arc<dyn DashboardApi>,
    selection: SharedSelection,
    active: Arc<ListLoader>,
    archived: Arc<ListLoader>,
    notifications: NotificationCenter,
    review: ReviewLoader,
    activities: Arc<dyn ActivityView>,
    poller: Arc<AlertPoller>,
    running: Mutex<Option<PollerHandle>>,
}

impl Dashboard {
    pub fn new(api: Arc<dyn DashboardApi>, cfg: &Config, views: Views) -> Self {
        let selection = FacilitySelection::new().shared();
        let page_size = cfg.dashboard.page_size;
        let active = Arc::new(ListLoader::new(
            ListKind::Active,
            api.clone(),
            selection.clone(),
            views.active,
            page_size,
        ));
        let archived = Arc::new(ListLoader::new(
            ListKind::Archived,
            api.clone(),
            selection.clone(),
            views.archived,
            page_size,
        ));
        let chime = if cfg.notifications.sound {
            views.chime
        } else {
            None
        };
        let notifications =
            NotificationCenter::new(cfg.notifications.clone(), views.notifications, chime);
        let review = ReviewLoader::new(api.clone(), views.detail, cfg.fanout_timeout());
        let poller = Arc::new(AlertPoller::new(
            api.clone(),
            selection.clone(),
            active.clone(),
            archived.clone(),
            notifications.clone(),
            cfg.poll_interval(),
        ));
        Self {
            api,
            selection,
            active,
            archived,
            notifications,
            review,
            activities: views.activities,
            poller,
            running: Mutex::new(None),
        }
    }

    /// Load facilities (all selected), both lists and the activity feed.
    #[instrument(skip_all)]
    pub async fn init(&self) -> Result<(), ApiError> {
        let facilities = self.api.facilities().await?;
        info!(count = facilities.len(), "loaded facilities");
        self.selection.lock().await.replace_known(facilities);
        self.reload_from_first_page().await;
        self.refresh_activities().await;
        Ok(())
    }

    pub fn selection(&self) -> &SharedSelection {
        &self.selection
    }

    pub fn loader(&self, kind: ListKind) -> &Arc<ListLoader> {
        match kind {
            ListKind::Active => &self.active,
            ListKind::Archived => &self.archived,
        }
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn review(&self) -> &ReviewLoader {
        &self.review
    }

    pub async fn toggle_facility(&self, facility_id: &str, checked: bool) -> bool {
        let changed = self
            .selection
            .lock()
            .await
            .toggle_facility(facility_id, checked);
        if changed {
            self.reload_from_first_page().await;
        }
        changed
    }

    pub async fn toggle_all(&self, checked: bool) {
        self.selection.lock().await.toggle_all(checked);
        self.reload_from_first_page().await;
    }

    async fn reload_from_first_page(&self) {
        // New filter, new baseline: a different facility set is not "new alerts".
        self.active.set_last_known_total(None).await;
        futures::join!(self.active.reset(), self.archived.reset());
    }

    pub async fn navigate(&self, kind: ListKind, nav: PageNav) {
        self.loader(kind).navigate(nav).await;
    }

    /// Single entry point for row actions from either table.
    pub async fn dispatch(&self, action: RowAction) {
        match action {
            RowAction::Review {
                patient_id,
                alert_id,
                patient_name,
            } => {
                self.open_review(patient_id, alert_id, &patient_name).await;
            }
            RowAction::Archive {
                alert_id,
                patient_name,
            } => {
                self.archive_alert(alert_id, &patient_name).await;
            }
        }
    }

    /// Archive an alert and surface the result as a notification.
    #[instrument(skip(self, patient_name))]
    pub async fn archive_alert(&self, alert_id: i64, patient_name: &str) -> bool {
        match self.api.archive_alert(alert_id, patient_name).await {
            Ok(_) => {
                info!(alert_id, "alert archived");
                self.notifications.success("Alert archived successfully");
                self.active.reload_current().await;
                self.archived.load(1).await;
                self.refresh_activities().await;
                true
            }
            Err(ApiError::Server { message }) => {
                warn!(alert_id, %message, "server refused to archive alert");
                self.notifications
                    .error(format!("Failed to archive alert: {}", message));
                false
            }
            Err(err) => {
                warn!(alert_id, %err, "error archiving alert");
                self.notifications.error("Error archiving alert");
                false
            }
        }
    }

    /// Open the detail view. The activity feed refreshes once the audit write
    /// lands; the returned `audit` handle covers both steps.
    pub async fn open_review(
        &self,
        patient_id: i64,
        alert_id: i64,
        patient_name: &str,
    ) -> OpenedReview {
        let OpenedReview { frame, audit } = self
            .review
            .open_review(patient_id, alert_id, patient_name)
            .await;
        let api = self.api.clone();
        let view = self.activities.clone();
        let audit = tokio::spawn(async move {
            if let Err(err) = audit.await {
                warn!(?err, "review audit task ended abnormally");
            }
            load_activities(api.as_ref(), view.as_ref()).await;
        });
        OpenedReview { frame, audit }
    }

    pub async fn refresh_activities(&self) {
        load_activities(self.api.as_ref(), self.activities.as_ref()).await;
    }

    /// Run one poll now, outside the timer.
    pub async fn poll_now(&self) -> PollOutcome {
        self.poller.tick().await
    }

    pub async fn start_poller(&self) {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return;
        }
        *running = Some(self.poller.clone().spawn(CancellationToken::new()));
    }

    pub async fn poller_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Stop the poller and clear pending notification timers.
    pub async fn shutdown(&self) {
        let handle = self.running.lock().await.take();
        if let Some(handle) = handle {
            handle.stop().await;
        }
        self.notifications.clear();
    }
}

async fn load_activities(api: &dyn DashboardApi, view: &dyn ActivityView) {
    match api.activities().await {
        Ok(activities) => view.render(&activities),
        Err(err) => warn!(%err, "failed to load activities"),
    }
}
