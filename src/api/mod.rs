use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::facility::FacilityFilter;
use crate::model::{
    AlertDetail, AlertPage, Facility, LabResult, ListKind, Medication, Patient, Vital,
};

pub mod model;

use self::model::{
    ActivitiesResp, AlertDetailResp, AlertsResp, ArchiveReq, FacilitiesResp, LabsResp,
    LogReviewReq, LoginReq, MedicationsResp, MessageResp, NewAlertsResp, PatientResp,
    RecommendationResp, VitalsResp,
};

/// Failure taxonomy for every backend call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network, DNS, TLS or non-2xx HTTP status.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Well-formed envelope carrying `success: false`.
    #[error("server error: {message}")]
    Server { message: String },
    /// Body was not JSON or lacked the expected fields.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    pub fn is_server(&self) -> bool {
        matches!(self, ApiError::Server { .. })
    }
}

/// Query shared by the active and archived list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListQuery {
    /// Comma-joined facility ids. Empty means "nothing selected".
    pub facilities: String,
    pub page: u32,
    pub per_page: u32,
}

impl ListQuery {
    pub fn new(filter: &FacilityFilter, page: u32, per_page: u32) -> Self {
        Self {
            facilities: filter.query_value(),
            page: page.max(1),
            per_page,
        }
    }
}

/// Everything the dashboard core reads from or writes to the backend.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn facilities(&self) -> Result<Vec<Facility>, ApiError>;

    async fn alerts(&self, list: ListKind, query: &ListQuery) -> Result<AlertPage, ApiError>;

    /// Returns the server's confirmation message.
    async fn archive_alert(&self, alert_id: i64, patient_name: &str) -> Result<String, ApiError>;

    async fn activities(&self) -> Result<Vec<String>, ApiError>;

    async fn log_review(&self, patient_name: &str) -> Result<(), ApiError>;

    async fn patient(&self, patient_id: i64) -> Result<Patient, ApiError>;

    async fn alert(&self, alert_id: i64) -> Result<AlertDetail, ApiError>;

    async fn recommendation(&self, alert_id: i64) -> Result<String, ApiError>;

    async fn vitals(&self, patient_id: i64) -> Result<Vec<Vital>, ApiError>;

    async fn medications(&self, patient_id: i64) -> Result<Vec<Medication>, ApiError>;

    async fn labs(&self, patient_id: i64) -> Result<Vec<LabResult>, ApiError>;
}

#[derive(Clone)]
pub struct RestClient {
    http: Client,
    base_url: Url,
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("careboard/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .timeout(timeout)
            .no_proxy()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, base_url })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let mut raw = cfg.server.base_url.trim().to_string();
        // Url::join drops the last path segment unless the base ends in '/'.
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url = Url::parse(&raw)
            .with_context(|| format!("invalid server.base_url: {}", cfg.server.base_url))?;
        Self::new(base_url, cfg.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Malformed(format!("invalid endpoint {}: {}", path, e)))
    }

    /// Starts a session; the cookie store keeps it for later calls.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let body = self
            .post_json("login", &LoginReq { email, password })
            .await?;
        decode_envelope::<Value>(body)?;
        info!(email, "logged in");
        Ok(())
    }

    /// Legacy five-minute "new alerts" flag; the poller uses count diffing instead.
    pub async fn check_new_alerts(&self) -> Result<NewAlertsResp, ApiError> {
        let body = self.get_json("api/check-new-alerts", None::<&()>).await?;
        decode_envelope(body)
    }

    async fn get_json<Q>(&self, path: &str, query: Option<&Q>) -> Result<Value, ApiError>
    where
        Q: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        let mut req = self.http.get(url);
        if let Some(q) = query {
            req = req.query(q);
        }
        let res = req.send().await?.error_for_status()?;
        debug!(path, status = %res.status(), "GET");
        read_json(path, res).await
    }

    async fn post_json<B>(&self, path: &str, body: &B) -> Result<Value, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        let res = self
            .http
            .post(url)
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        debug!(path, status = %res.status(), "POST");
        read_json(path, res).await
    }
}

async fn read_json(path: &str, res: reqwest::Response) -> Result<Value, ApiError> {
    let text = res.text().await?;
    serde_json::from_str(&text)
        .map_err(|e| ApiError::Malformed(format!("{} returned non-JSON body: {}", path, e)))
}

/// Check the `success` flag and deserialize the remaining fields.
pub fn decode_envelope<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    match body.get("success").and_then(Value::as_bool) {
        Some(true) => {}
        Some(false) => {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("request failed")
                .to_string();
            return Err(ApiError::Server { message });
        }
        None => {
            return Err(ApiError::Malformed(
                "response envelope has no boolean `success`".into(),
            ))
        }
    }
    serde_json::from_value(body).map_err(|e| ApiError::Malformed(e.to_string()))
}

#[async_trait]
impl DashboardApi for RestClient {
    async fn facilities(&self) -> Result<Vec<Facility>, ApiError> {
        let body = self.get_json("api/facilities", None::<&()>).await?;
        Ok(decode_envelope::<FacilitiesResp>(body)?.facilities)
    }

    async fn alerts(&self, list: ListKind, query: &ListQuery) -> Result<AlertPage, ApiError> {
        let body = self.get_json(list.endpoint(), Some(query)).await?;
        let resp: AlertsResp = decode_envelope(body)?;
        Ok(AlertPage {
            alerts: resp.alerts,
            page: resp.page,
            total_pages: resp.total_pages,
            total: resp.total,
        })
    }

    async fn archive_alert(&self, alert_id: i64, patient_name: &str) -> Result<String, ApiError> {
        let body = self
            .post_json(
                "api/archive-alert",
                &ArchiveReq {
                    alert_id,
                    patient_name,
                },
            )
            .await?;
        let resp: MessageResp = decode_envelope(body)?;
        Ok(resp
            .message
            .unwrap_or_else(|| "Alert archived successfully".to_string()))
    }

    async fn activities(&self) -> Result<Vec<String>, ApiError> {
        let body = self.get_json("api/activities", None::<&()>).await?;
        Ok(decode_envelope::<ActivitiesResp>(body)?.activities)
    }

    async fn log_review(&self, patient_name: &str) -> Result<(), ApiError> {
        let body = self
            .post_json("api/log-review", &LogReviewReq { patient_name })
            .await?;
        decode_envelope::<Value>(body)?;
        Ok(())
    }

    async fn patient(&self, patient_id: i64) -> Result<Patient, ApiError> {
        let body = self
            .get_json(&format!("api/patient/{}", patient_id), None::<&()>)
            .await?;
        Ok(decode_envelope::<PatientResp>(body)?.patient)
    }

    async fn alert(&self, alert_id: i64) -> Result<AlertDetail, ApiError> {
        let body = self
            .get_json(&format!("api/alert/{}", alert_id), None::<&()>)
            .await?;
        Ok(decode_envelope::<AlertDetailResp>(body)?.alert)
    }

    async fn recommendation(&self, alert_id: i64) -> Result<String, ApiError> {
        let body = self
            .get_json(&format!("api/recommendation/{}", alert_id), None::<&()>)
            .await?;
        Ok(decode_envelope::<RecommendationResp>(body)?.recommendation)
    }

    async fn vitals(&self, patient_id: i64) -> Result<Vec<Vital>, ApiError> {
        let body = self
            .get_json(&format!("api/vitals/{}", patient_id), None::<&()>)
            .await?;
        Ok(decode_envelope::<VitalsResp>(body)?.vitals)
    }

    async fn medications(&self, patient_id: i64) -> Result<Vec<Medication>, ApiError> {
        let body = self
            .get_json(&format!("api/medications/{}", patient_id), None::<&()>)
            .await?;
        Ok(decode_envelope::<MedicationsResp>(body)?.medications)
    }

    async fn labs(&self, patient_id: i64) -> Result<Vec<LabResult>, ApiError> {
        let body = self
            .get_json(&format!("api/labs/{}", patient_id), None::<&()>)
            .await?;
        Ok(decode_envelope::<LabsResp>(body)?.labs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_success_false_is_server_error() {
        let err = decode_envelope::<FacilitiesResp>(json!({
            "success": false,
            "message": "db down"
        }))
        .unwrap_err();
        match err {
            ApiError::Server { message } => assert_eq!(message, "db down"),
            other => panic!("wrong error: {other:?}"),
        }
    }

    #[test]
    fn envelope_without_success_is_malformed() {
        let err = decode_envelope::<FacilitiesResp>(json!({ "facilities": [] })).unwrap_err();
        assert!(matches!(err, ApiError::Malformed(_)));
    }

    #[test]
    fn envelope_missing_field_is_malformed() {
        let err = decode_envelope::<AlertsResp>(json!({ "success": true, "alerts": [] }))
            .unwrap_err();
        assert!(matches!(err, ApiError::Malformed(_)));
    }

    #[test]
    fn envelope_decodes_alert_page() {
        let resp: AlertsResp = decode_envelope(json!({
            "success": true,
            "alerts": [{
                "alert_id": 9,
                "patient_id": 4,
                "alert_type": "High HR",
                "alert_date_time": "Today, 09:15 AM",
                "facility_id": 2,
                "patient_first_name": "Ada",
                "patient_last_name": "King",
                "facility_name": "Oak"
            }],
            "page": 1,
            "total_pages": 3,
            "total": 13
        }))
        .unwrap();
        assert_eq!(resp.alerts.len(), 1);
        assert_eq!(resp.alerts[0].patient_name(), "Ada King");
        assert_eq!(resp.alerts[0].facility_id.as_deref(), Some("2"));
        assert_eq!(resp.total, Some(13));
    }

    #[test]
    fn from_config_normalizes_trailing_slash() {
        let mut cfg: Config = serde_yaml::from_str(crate::config::example()).unwrap();
        cfg.server.base_url = "http://dash.local/care".into();
        let client = RestClient::from_config(&cfg).unwrap();
        assert_eq!(
            client.endpoint("api/alerts").unwrap().as_str(),
            "http://dash.local/care/api/alerts"
        );
    }
}
