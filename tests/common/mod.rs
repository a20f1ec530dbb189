#![allow(dead_code)]

use async_trait::async_trait;
use careboard::api::{ApiError, DashboardApi, ListQuery};
use careboard::config::{self, Config};
use careboard::dashboard::{ActivityView, Dashboard, Views};
use careboard::model::{
    Alert, AlertDetail, AlertPage, Facility, LabResult, ListKind, Medication, Patient, Vital,
};
use careboard::notify::{Chime, Notification, NotificationPresenter};
use careboard::pagination::{ListFrame, ListView};
use careboard::review::{DetailFrame, DetailView};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Duration;

pub fn facility(id: &str, name: &str) -> Facility {
    Facility {
        facility_id: id.to_string(),
        facility_name: name.to_string(),
    }
}

pub fn alert(alert_id: i64, patient_id: i64, facility_id: &str, alert_type: &str) -> Alert {
    Alert {
        alert_id,
        patient_id,
        alert_type: alert_type.to_string(),
        alert_date_time: Some("Today, 09:15 AM".into()),
        facility_id: Some(facility_id.to_string()),
        patient_first_name: format!("Pat{}", patient_id),
        patient_last_name: "Doe".into(),
        facility_name: format!("Facility {}", facility_id),
    }
}

pub fn test_config() -> Config {
    let mut cfg: Config = serde_yaml::from_str(config::example()).unwrap();
    cfg.dashboard.page_size = 2;
    cfg.dashboard.fanout_timeout_secs = 5;
    cfg.notifications.sound = true;
    cfg
}

#[derive(Default)]
struct State {
    facilities: Vec<Facility>,
    active: Vec<Alert>,
    archived: Vec<Alert>,
    activities: Vec<String>,
    alert_queries: Vec<(ListKind, ListQuery)>,
    /// Per-call delays for list reads, consumed in order.
    alert_delays: VecDeque<Duration>,
    failing_alert_calls: usize,
    omit_total: bool,
    archive_error: Option<String>,
    failing_sections: HashSet<&'static str>,
    slow_section: Option<(&'static str, Duration)>,
    reviews_logged: Vec<String>,
    activity_calls: usize,
}

/// In-memory backend with scripted failures and call recording.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<State>>,
}

impl FakeBackend {
    pub fn new(facilities: Vec<Facility>, active: Vec<Alert>) -> Self {
        let backend = Self::default();
        {
            let mut s = backend.state.try_lock().unwrap();
            s.facilities = facilities;
            s.active = active;
        }
        backend
    }

    pub async fn push_active(&self, alert: Alert) {
        self.state.lock().await.active.push(alert);
    }

    pub async fn remove_active(&self, alert_id: i64) {
        self.state.lock().await.active.retain(|a| a.alert_id != alert_id);
    }

    pub async fn delay_next_alerts(&self, delays: Vec<Duration>) {
        self.state.lock().await.alert_delays = delays.into();
    }

    pub async fn fail_next_alerts(&self, n: usize) {
        self.state.lock().await.failing_alert_calls = n;
    }

    pub async fn omit_total(&self) {
        self.state.lock().await.omit_total = true;
    }

    pub async fn refuse_archive(&self, message: &str) {
        self.state.lock().await.archive_error = Some(message.to_string());
    }

    pub async fn fail_section(&self, section: &'static str) {
        self.state.lock().await.failing_sections.insert(section);
    }

    pub async fn slow_section(&self, section: &'static str, delay: Duration) {
        self.state.lock().await.slow_section = Some((section, delay));
    }

    pub async fn alert_queries(&self) -> Vec<(ListKind, ListQuery)> {
        self.state.lock().await.alert_queries.clone()
    }

    pub async fn reviews_logged(&self) -> Vec<String> {
        self.state.lock().await.reviews_logged.clone()
    }

    pub async fn activity_calls(&self) -> usize {
        self.state.lock().await.activity_calls
    }

    pub async fn archived_ids(&self) -> Vec<i64> {
        self.state.lock().await.archived.iter().map(|a| a.alert_id).collect()
    }

    async fn section(&self, name: &'static str) -> Result<(), ApiError> {
        let (fail, delay) = {
            let s = self.state.lock().await;
            let delay = s
                .slow_section
                .filter(|(section, _)| *section == name)
                .map(|(_, d)| d);
            (s.failing_sections.contains(name), delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(ApiError::Server {
                message: format!("{} unavailable", name),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DashboardApi for FakeBackend {
    async fn facilities(&self) -> Result<Vec<Facility>, ApiError> {
        Ok(self.state.lock().await.facilities.clone())
    }

    async fn alerts(&self, list: ListKind, query: &ListQuery) -> Result<AlertPage, ApiError> {
        let delay = {
            let mut s = self.state.lock().await;
            s.alert_queries.push((list, query.clone()));
            s.alert_delays.pop_front()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut s = self.state.lock().await;
        if s.failing_alert_calls > 0 {
            s.failing_alert_calls -= 1;
            return Err(ApiError::Malformed("connection reset".into()));
        }
        let wanted: HashSet<&str> = query
            .facilities
            .split(',')
            .filter(|id| !id.is_empty())
            .collect();
        let source = match list {
            ListKind::Active => &s.active,
            ListKind::Archived => &s.archived,
        };
        let matching: Vec<Alert> = source
            .iter()
            .filter(|a| a.facility_id.as_deref().is_some_and(|id| wanted.contains(id)))
            .cloned()
            .collect();
        let per_page = query.per_page.max(1) as usize;
        let total_pages = matching.len().div_ceil(per_page) as u32;
        let start = (query.page.saturating_sub(1) as usize) * per_page;
        let alerts = matching.iter().skip(start).take(per_page).cloned().collect();
        Ok(AlertPage {
            alerts,
            page: query.page,
            total_pages,
            total: (!s.omit_total).then_some(matching.len() as u64),
        })
    }

    async fn archive_alert(&self, alert_id: i64, patient_name: &str) -> Result<String, ApiError> {
        let mut s = self.state.lock().await;
        if let Some(message) = s.archive_error.clone() {
            return Err(ApiError::Server { message });
        }
        let Some(pos) = s.active.iter().position(|a| a.alert_id == alert_id) else {
            return Err(ApiError::Malformed(format!("no alert {}", alert_id)));
        };
        let alert = s.active.remove(pos);
        s.archived.insert(0, alert);
        s.activities
            .insert(0, format!("You archived alert for {}", patient_name));
        Ok("Alert archived successfully".into())
    }

    async fn activities(&self) -> Result<Vec<String>, ApiError> {
        let mut s = self.state.lock().await;
        s.activity_calls += 1;
        Ok(s.activities.clone())
    }

    async fn log_review(&self, patient_name: &str) -> Result<(), ApiError> {
        let mut s = self.state.lock().await;
        s.reviews_logged.push(patient_name.to_string());
        s.activities
            .insert(0, format!("You reviewed alert for {}", patient_name));
        Ok(())
    }

    async fn patient(&self, patient_id: i64) -> Result<Patient, ApiError> {
        self.section("patient").await?;
        Ok(Patient {
            patient_id,
            patient_first_name: format!("Pat{}", patient_id),
            patient_last_name: "Doe".into(),
            ..Default::default()
        })
    }

    async fn alert(&self, alert_id: i64) -> Result<AlertDetail, ApiError> {
        self.section("alert").await?;
        Ok(AlertDetail {
            alert_id,
            alert_type: "High HR".into(),
            alert_detail: Some("Heart rate 130 bpm".into()),
            ..Default::default()
        })
    }

    async fn recommendation(&self, _alert_id: i64) -> Result<String, ApiError> {
        self.section("recommendation").await?;
        Ok("Recheck vitals within one hour".into())
    }

    async fn vitals(&self, _patient_id: i64) -> Result<Vec<Vital>, ApiError> {
        self.section("vitals").await?;
        Ok(vec![Vital {
            heart_rate: Some("130".into()),
            ..Default::default()
        }])
    }

    async fn medications(&self, _patient_id: i64) -> Result<Vec<Medication>, ApiError> {
        self.section("medications").await?;
        Ok(vec![Medication {
            medication_name: "Metoprolol".into(),
            medication_dose: Some("25mg".into()),
            ..Default::default()
        }])
    }

    async fn labs(&self, _patient_id: i64) -> Result<Vec<LabResult>, ApiError> {
        self.section("labs").await?;
        Ok(vec![])
    }
}

#[derive(Default)]
pub struct RecordingList {
    frames: std::sync::Mutex<Vec<ListFrame>>,
}

impl RecordingList {
    pub fn frames(&self) -> Vec<ListFrame> {
        self.frames.lock().unwrap().clone()
    }

    pub fn last(&self) -> ListFrame {
        self.frames().pop().expect("nothing rendered")
    }

    pub fn count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }
}

impl ListView for RecordingList {
    fn render(&self, frame: &ListFrame) {
        self.frames.lock().unwrap().push(frame.clone());
    }
}

#[derive(Default)]
pub struct RecordingDetail {
    frames: std::sync::Mutex<Vec<DetailFrame>>,
}

impl RecordingDetail {
    pub fn frames(&self) -> Vec<DetailFrame> {
        self.frames.lock().unwrap().clone()
    }
}

impl DetailView for RecordingDetail {
    fn render(&self, frame: &DetailFrame) {
        self.frames.lock().unwrap().push(frame.clone());
    }
}

#[derive(Default)]
pub struct RecordingActivities {
    renders: std::sync::Mutex<Vec<Vec<String>>>,
}

impl RecordingActivities {
    pub fn renders(&self) -> Vec<Vec<String>> {
        self.renders.lock().unwrap().clone()
    }
}

impl ActivityView for RecordingActivities {
    fn render(&self, activities: &[String]) {
        self.renders.lock().unwrap().push(activities.to_vec());
    }
}

#[derive(Default)]
pub struct RecordingNotifications {
    shown: std::sync::Mutex<Vec<Notification>>,
    removed: std::sync::Mutex<Vec<u64>>,
}

impl RecordingNotifications {
    pub fn shown(&self) -> Vec<Notification> {
        self.shown.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.shown().into_iter().map(|n| n.message).collect()
    }

    pub fn removed(&self) -> Vec<u64> {
        self.removed.lock().unwrap().clone()
    }
}

impl NotificationPresenter for RecordingNotifications {
    fn show(&self, notification: &Notification) {
        self.shown.lock().unwrap().push(notification.clone());
    }

    fn remove(&self, id: u64) {
        self.removed.lock().unwrap().push(id);
    }
}

#[derive(Default)]
pub struct CountingChime(AtomicUsize);

impl CountingChime {
    pub fn plays(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl Chime for CountingChime {
    fn play(&self) -> anyhow::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A dashboard wired to recording views.
pub struct Harness {
    pub backend: FakeBackend,
    pub dashboard: Dashboard,
    pub active: Arc<RecordingList>,
    pub archived: Arc<RecordingList>,
    pub detail: Arc<RecordingDetail>,
    pub activities: Arc<RecordingActivities>,
    pub notifications: Arc<RecordingNotifications>,
    pub chime: Arc<CountingChime>,
}

impl Harness {
    pub fn new(backend: FakeBackend) -> Self {
        Self::with_config(backend, &test_config())
    }

    pub fn with_config(backend: FakeBackend, cfg: &Config) -> Self {
        let active = Arc::new(RecordingList::default());
        let archived = Arc::new(RecordingList::default());
        let detail = Arc::new(RecordingDetail::default());
        let activities = Arc::new(RecordingActivities::default());
        let notifications = Arc::new(RecordingNotifications::default());
        let chime = Arc::new(CountingChime::default());
        let views = Views {
            active: active.clone(),
            archived: archived.clone(),
            detail: detail.clone(),
            activities: activities.clone(),
            notifications: notifications.clone(),
            chime: Some(chime.clone()),
        };
        let dashboard = Dashboard::new(Arc::new(backend.clone()), cfg, views);
        Self {
            backend,
            dashboard,
            active,
            archived,
            detail,
            activities,
            notifications,
            chime,
        }
    }
}

/// Two facilities, five active alerts (three at facility 1, two at facility 2).
pub fn seeded_backend() -> FakeBackend {
    FakeBackend::new(
        vec![facility("1", "Oak"), facility("2", "Elm")],
        vec![
            alert(101, 11, "1", "High HR"),
            alert(102, 12, "2", "Low SpO2"),
            alert(103, 13, "1", "Weight gain"),
            alert(104, 14, "2", "Fever"),
            alert(105, 15, "1", "Decreased appetite"),
        ],
    )
}
