//! Response bodies of the dashboard REST API, minus the `success`/`message`
//! envelope which `decode_envelope` strips first.
use serde::{Deserialize, Serialize};

use crate::model::{Alert, AlertDetail, Facility, LabResult, Medication, Patient, Vital};

#[derive(Deserialize, Debug)]
pub struct FacilitiesResp {
    pub facilities: Vec<Facility>,
}

#[derive(Deserialize, Debug)]
pub struct AlertsResp {
    pub alerts: Vec<Alert>,
    pub page: u32,
    pub total_pages: u32,
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Deserialize, Debug)]
pub struct MessageResp {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ActivitiesResp {
    pub activities: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewAlertsResp {
    pub has_new_alerts: bool,
    pub count: u64,
}

#[derive(Deserialize, Debug)]
pub struct PatientResp {
    pub patient: Patient,
}

#[derive(Deserialize, Debug)]
pub struct AlertDetailResp {
    pub alert: AlertDetail,
}

#[derive(Deserialize, Debug)]
pub struct RecommendationResp {
    pub recommendation: String,
}

#[derive(Deserialize, Debug)]
pub struct VitalsResp {
    pub vitals: Vec<Vital>,
}

#[derive(Deserialize, Debug)]
pub struct MedicationsResp {
    pub medications: Vec<Medication>,
}

#[derive(Deserialize, Debug)]
pub struct LabsResp {
    pub labs: Vec<LabResult>,
}

#[derive(Serialize, Debug)]
pub struct LoginReq<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Serialize, Debug)]
pub struct ArchiveReq<'a> {
    pub alert_id: i64,
    pub patient_name: &'a str,
}

#[derive(Serialize, Debug)]
pub struct LogReviewReq<'a> {
    pub patient_name: &'a str,
}
