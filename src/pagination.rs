//! Paginated list loader used for both the active and archived alert tables.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::api::{DashboardApi, ListQuery};
use crate::facility::SharedSelection;
use crate::model::{Alert, AlertPage, ListKind, Severity};

/// Per-list bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertListState {
    pub current_page: u32,
    pub page_size: u32,
    /// Only written by the poller, and only for the active list.
    pub last_known_total: Option<u64>,
}

impl AlertListState {
    pub fn new(page_size: u32) -> Self {
        Self {
            current_page: 1,
            page_size,
            last_known_total: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Previous,
    Page,
    Next,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageControl {
    pub kind: ControlKind,
    pub label: String,
    pub target: u32,
    pub disabled: bool,
    pub active: bool,
}

/// Navigation request resolved against the rendered controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNav {
    Previous,
    Next,
    Page(u32),
}

/// Most numbered links rendered at once; longer lists show a window around
/// the current page.
pub const MAX_PAGE_LINKS: u32 = 10;

fn page_window(current: u32, total_pages: u32) -> (u32, u32) {
    let half = MAX_PAGE_LINKS / 2;
    let mut first = current.saturating_sub(half).max(1);
    let last = first
        .saturating_add(MAX_PAGE_LINKS - 1)
        .min(total_pages);
    if last - first + 1 < MAX_PAGE_LINKS {
        first = last.saturating_sub(MAX_PAGE_LINKS - 1).max(1);
    }
    (first, last)
}

/// Previous / page links / Next. Nothing at all for a single page.
pub fn pagination_controls(current: u32, total_pages: u32) -> Vec<PageControl> {
    if total_pages <= 1 {
        return Vec::new();
    }
    let (first, last) = page_window(current, total_pages);
    let mut controls = Vec::with_capacity((last - first + 1) as usize + 2);
    controls.push(PageControl {
        kind: ControlKind::Previous,
        label: "Previous".into(),
        target: current.saturating_sub(1),
        disabled: current <= 1,
        active: false,
    });
    for i in first..=last {
        controls.push(PageControl {
            kind: ControlKind::Page,
            label: i.to_string(),
            target: i,
            disabled: false,
            active: i == current,
        });
    }
    controls.push(PageControl {
        kind: ControlKind::Next,
        label: "Next".into(),
        target: current.saturating_add(1),
        disabled: current >= total_pages,
        active: false,
    });
    controls
}

/// Action carried by a rendered row; dispatched through one entry point
/// instead of per-row handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowAction {
    Review {
        patient_id: i64,
        alert_id: i64,
        patient_name: String,
    },
    Archive {
        alert_id: i64,
        patient_name: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertRow {
    pub alert_id: i64,
    pub patient_id: i64,
    pub patient_name: String,
    pub facility_name: String,
    pub alert_type: String,
    pub alert_date_time: String,
    pub severity: Severity,
    pub actions: Vec<RowAction>,
}

impl AlertRow {
    pub fn from_alert(kind: ListKind, alert: &Alert) -> Self {
        let patient_name = alert.patient_name();
        let mut actions = vec![RowAction::Review {
            patient_id: alert.patient_id,
            alert_id: alert.alert_id,
            patient_name: patient_name.clone(),
        }];
        if kind == ListKind::Active {
            actions.push(RowAction::Archive {
                alert_id: alert.alert_id,
                patient_name: patient_name.clone(),
            });
        }
        Self {
            alert_id: alert.alert_id,
            patient_id: alert.patient_id,
            patient_name,
            facility_name: alert.facility_name.clone(),
            alert_type: alert.alert_type.clone(),
            alert_date_time: alert.alert_date_time.clone().unwrap_or_default(),
            severity: alert.severity(),
            actions,
        }
    }

    pub fn review_action(&self) -> Option<&RowAction> {
        self.actions
            .iter()
            .find(|a| matches!(a, RowAction::Review { .. }))
    }

    pub fn archive_action(&self) -> Option<&RowAction> {
        self.actions
            .iter()
            .find(|a| matches!(a, RowAction::Archive { .. }))
    }
}

/// Complete render output for one list. Each frame replaces the previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct ListFrame {
    pub kind: ListKind,
    pub rows: Vec<AlertRow>,
    pub page: u32,
    pub total_pages: u32,
    pub total: Option<u64>,
    pub controls: Vec<PageControl>,
}

impl ListFrame {
    pub fn build(kind: ListKind, page: &AlertPage) -> Self {
        let current = page.page.max(1);
        Self {
            kind,
            rows: page
                .alerts
                .iter()
                .map(|a| AlertRow::from_alert(kind, a))
                .collect(),
            page: current,
            total_pages: page.total_pages,
            total: page.total,
            controls: pagination_controls(current, page.total_pages),
        }
    }

    pub fn empty_text(&self) -> Option<&'static str> {
        self.rows.is_empty().then(|| self.kind.empty_text())
    }

    /// Find the rendered control a navigation request refers to.
    pub fn resolve(&self, nav: PageNav) -> Option<&PageControl> {
        self.controls.iter().find(|c| match nav {
            PageNav::Previous => c.kind == ControlKind::Previous,
            PageNav::Next => c.kind == ControlKind::Next,
            PageNav::Page(n) => c.kind == ControlKind::Page && c.target == n,
        })
    }
}

/// Render callback for a list table.
pub trait ListView: Send + Sync {
    fn render(&self, frame: &ListFrame);
}

struct Rendered {
    state: AlertListState,
    frame: Option<ListFrame>,
}

pub struct ListLoader {
    kind: ListKind,
    api: Arc<dyn DashboardApi>,
    selection: SharedSelection,
    view: Arc<dyn ListView>,
    rendered: Mutex<Rendered>,
    latest_seq: AtomicU64,
}

impl ListLoader {
    pub fn new(
        kind: ListKind,
        api: Arc<dyn DashboardApi>,
        selection: SharedSelection,
        view: Arc<dyn ListView>,
        page_size: u32,
    ) -> Self {
        Self {
            kind,
            api,
            selection,
            view,
            rendered: Mutex::new(Rendered {
                state: AlertListState::new(page_size),
                frame: None,
            }),
            latest_seq: AtomicU64::new(0),
        }
    }

    pub fn kind(&self) -> ListKind {
        self.kind
    }

    /// Fetch and render one page.
    ///
    /// Returns `None` when the load failed or was superseded by a later one;
    /// in both cases the displayed list is left untouched.
    #[instrument(skip(self), fields(list = self.kind.as_str()))]
    pub async fn load(&self, page: u32) -> Option<AlertPage> {
        let filter = self.selection.lock().await.snapshot();
        let page_size = {
            let mut guard = self.rendered.lock().await;
            guard.state.current_page = page.max(1);
            guard.state.page_size
        };
        let seq = self.latest_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let query = ListQuery::new(&filter, page, page_size);

        let result = self.api.alerts(self.kind, &query).await;

        let mut guard = self.rendered.lock().await;
        if self.latest_seq.load(Ordering::SeqCst) != seq {
            debug!(seq, requested = page, "dropping superseded list response");
            return None;
        }
        match result {
            Ok(resp) => {
                let frame = ListFrame::build(self.kind, &resp);
                guard.state.current_page = frame.page;
                self.view.render(&frame);
                guard.frame = Some(frame);
                Some(resp)
            }
            Err(err) => {
                warn!(%err, requested = page, "failed to load alerts; keeping current list");
                None
            }
        }
    }

    pub async fn reload_current(&self) -> Option<AlertPage> {
        let page = self.current_page().await;
        self.load(page).await
    }

    /// Back to page 1, used after a filter change.
    pub async fn reset(&self) -> Option<AlertPage> {
        self.load(1).await
    }

    /// Activate a pagination control. Disabled controls never issue a request.
    pub async fn activate(&self, control: &PageControl) -> Option<AlertPage> {
        if control.disabled {
            debug!(label = %control.label, "ignoring disabled pagination control");
            return None;
        }
        self.load(control.target).await
    }

    /// Resolve `nav` against the rendered controls and activate it.
    pub async fn navigate(&self, nav: PageNav) -> Option<AlertPage> {
        let control = {
            let guard = self.rendered.lock().await;
            guard.frame.as_ref().and_then(|f| f.resolve(nav)).cloned()
        };
        match control {
            Some(control) => self.activate(&control).await,
            None => {
                debug!(?nav, "no such pagination control rendered");
                None
            }
        }
    }

    pub async fn current_page(&self) -> u32 {
        self.rendered.lock().await.state.current_page
    }

    pub async fn state(&self) -> AlertListState {
        self.rendered.lock().await.state.clone()
    }

    pub async fn frame(&self) -> Option<ListFrame> {
        self.rendered.lock().await.frame.clone()
    }

    /// Row by zero-based position in the rendered frame.
    pub async fn row(&self, index: usize) -> Option<AlertRow> {
        let guard = self.rendered.lock().await;
        guard.frame.as_ref().and_then(|f| f.rows.get(index).cloned())
    }

    pub async fn last_known_total(&self) -> Option<u64> {
        self.rendered.lock().await.state.last_known_total
    }

    pub async fn set_last_known_total(&self, total: Option<u64>) {
        self.rendered.lock().await.state.last_known_total = total;
    }
}
