use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Which of the two alert collections a list shows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ListKind {
    Active,
    Archived,
}

impl ListKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Active => "active",
            ListKind::Archived => "archived",
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            ListKind::Active => "api/alerts",
            ListKind::Archived => "api/archived-alerts",
        }
    }

    pub fn empty_text(&self) -> &'static str {
        match self {
            ListKind::Active => "No alerts found for selected facilities",
            ListKind::Archived => "No archived alerts",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Facility {
    #[serde(deserialize_with = "string_or_number")]
    pub facility_id: String,
    pub facility_name: String,
}

/// One row of the active or archived alert list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub alert_id: i64,
    pub patient_id: i64,
    pub alert_type: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub alert_date_time: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub facility_id: Option<String>,
    pub patient_first_name: String,
    pub patient_last_name: String,
    #[serde(default)]
    pub facility_name: String,
}

impl Alert {
    pub fn patient_name(&self) -> String {
        format!("{} {}", self.patient_first_name, self.patient_last_name)
    }

    pub fn severity(&self) -> Severity {
        Severity::classify(&self.alert_type)
    }
}

static DANGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)weight|high hr|heart").expect("valid danger regex"));
static WARNING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)low|decreased").expect("valid warning regex"));

/// Row highlight derived from the alert type text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    Danger,
    Warning,
    Normal,
}

impl Severity {
    pub fn classify(alert_type: &str) -> Self {
        if DANGER.is_match(alert_type) {
            Severity::Danger
        } else if WARNING.is_match(alert_type) {
            Severity::Warning
        } else {
            Severity::Normal
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            Severity::Danger => "!!",
            Severity::Warning => "! ",
            Severity::Normal => "  ",
        }
    }
}

/// One page of a filtered alert collection as reported by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertPage {
    pub alerts: Vec<Alert>,
    pub page: u32,
    pub total_pages: u32,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Patient {
    pub patient_id: i64,
    #[serde(default)]
    pub patient_first_name: String,
    #[serde(default)]
    pub patient_last_name: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub patient_dob: Option<String>,
    #[serde(default)]
    pub patient_age: Option<i64>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub patient_gender: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub patient_room: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub patient_admission_date: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub patient_insurance: Option<String>,
    #[serde(default)]
    pub facility_name: Option<String>,
    #[serde(default)]
    pub facility_email: Option<String>,
    #[serde(default)]
    pub physician_first_name: Option<String>,
    #[serde(default)]
    pub physician_last_name: Option<String>,
    #[serde(default)]
    pub physician_email: Option<String>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.patient_first_name, self.patient_last_name)
    }

    pub fn physician(&self) -> Option<String> {
        match (&self.physician_first_name, &self.physician_last_name) {
            (Some(first), Some(last)) => Some(format!("Dr. {} {}", first, last)),
            (None, Some(last)) => Some(format!("Dr. {}", last)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AlertDetail {
    pub alert_id: i64,
    #[serde(default)]
    pub patient_id: Option<i64>,
    #[serde(default)]
    pub alert_type: String,
    #[serde(default)]
    pub alert_detail: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub alert_date_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Vital {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub blood_pressure: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub heart_rate: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub temperature: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub weight: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub height: Option<String>,
    #[serde(default, rename = "BMI", deserialize_with = "opt_string_or_number")]
    pub bmi: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub spo2: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub vitals_date_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Medication {
    #[serde(default)]
    pub medication_name: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub medication_dose: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub medication_date_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LabResult {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub sodium: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub potassium: Option<String>,
    #[serde(default, rename = "BUN", deserialize_with = "opt_string_or_number")]
    pub bun: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub creatinine: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub glucose: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub lab_date_time: Option<String>,
}

/// Ids and measurements arrive as numbers or strings depending on the column.
fn string_or_number<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(de)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn opt_string_or_number<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(de)? {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected scalar, got {}",
            other
        ))),
    }
}
