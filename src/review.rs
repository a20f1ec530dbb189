//! Review/detail session: one patient+alert pair and its fan-out reads.
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::api::{ApiError, DashboardApi};
use crate::model::{AlertDetail, LabResult, Medication, Patient, Vital};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSession {
    pub patient_id: i64,
    pub alert_id: i64,
    pub patient_name: String,
}

/// Composed detail view. `None` marks a section whose read failed or timed
/// out; the renderer shows that section's empty state.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailFrame {
    pub session: ReviewSession,
    pub patient: Option<Patient>,
    pub alert: Option<AlertDetail>,
    pub recommendation: Option<String>,
    pub vitals: Option<Vec<Vital>>,
    pub medications: Option<Vec<Medication>>,
    pub labs: Option<Vec<LabResult>>,
}

impl DetailFrame {
    pub fn failed_sections(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.patient.is_none() {
            out.push("patient");
        }
        if self.alert.is_none() {
            out.push("alert");
        }
        if self.recommendation.is_none() {
            out.push("recommendation");
        }
        if self.vitals.is_none() {
            out.push("vitals");
        }
        if self.medications.is_none() {
            out.push("medications");
        }
        if self.labs.is_none() {
            out.push("labs");
        }
        out
    }
}

pub trait DetailView: Send + Sync {
    fn render(&self, frame: &DetailFrame);
}

/// Result of opening a review. `frame` is `None` when a newer review
/// superseded this one before its reads settled.
pub struct OpenedReview {
    pub frame: Option<DetailFrame>,
    /// Background audit-log write; awaiting it is optional.
    pub audit: JoinHandle<()>,
}

pub struct ReviewLoader {
    api: Arc<dyn DashboardApi>,
    view: Arc<dyn DetailView>,
    session: Mutex<Option<ReviewSession>>,
    latest_seq: AtomicU64,
    read_timeout: Duration,
}

impl ReviewLoader {
    pub fn new(api: Arc<dyn DashboardApi>, view: Arc<dyn DetailView>, read_timeout: Duration) -> Self {
        Self {
            api,
            view,
            session: Mutex::new(None),
            latest_seq: AtomicU64::new(0),
            read_timeout,
        }
    }

    pub fn session(&self) -> Option<ReviewSession> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    #[instrument(skip(self, patient_name))]
    pub async fn open_review(
        &self,
        patient_id: i64,
        alert_id: i64,
        patient_name: &str,
    ) -> OpenedReview {
        let session = ReviewSession {
            patient_id,
            alert_id,
            patient_name: patient_name.to_string(),
        };
        *self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(session.clone());
        let seq = self.latest_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let audit = {
            let api = self.api.clone();
            let name = session.patient_name.clone();
            tokio::spawn(async move {
                if let Err(err) = api.log_review(&name).await {
                    warn!(%err, patient = %name, "failed to record review activity");
                }
            })
        };

        let limit = self.read_timeout;
        let api = &self.api;
        let (patient, alert, recommendation, vitals, medications, labs) = futures::join!(
            bounded(limit, "patient", api.patient(patient_id)),
            bounded(limit, "alert", api.alert(alert_id)),
            bounded(limit, "recommendation", api.recommendation(alert_id)),
            bounded(limit, "vitals", api.vitals(patient_id)),
            bounded(limit, "medications", api.medications(patient_id)),
            bounded(limit, "labs", api.labs(patient_id)),
        );

        if self.latest_seq.load(Ordering::SeqCst) != seq {
            debug!(patient_id, alert_id, "review superseded; dropping detail");
            return OpenedReview { frame: None, audit };
        }

        let frame = DetailFrame {
            session,
            patient,
            alert,
            recommendation,
            vitals,
            medications,
            labs,
        };
        let failed = frame.failed_sections();
        if !failed.is_empty() {
            warn!(?failed, "rendering detail view with empty sections");
        }
        self.view.render(&frame);
        OpenedReview {
            frame: Some(frame),
            audit,
        }
    }
}

async fn bounded<T, F>(limit: Duration, section: &'static str, read: F) -> Option<T>
where
    F: Future<Output = Result<T, ApiError>>,
{
    match tokio::time::timeout(limit, read).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            warn!(section, %err, "detail read failed");
            None
        }
        Err(_) => {
            warn!(section, ?limit, "detail read timed out");
            None
        }
    }
}
