use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// A follow-up record tied to a past visit. Dates are calendar days, not
/// timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUp {
    pub record_id: i64,
    pub patient_id: String,
    pub fullname: Option<String>,
    pub appointment_date: NaiveDate,
    pub next_visit_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFollowUpRequest {
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub appointment_date: Option<String>,
    #[serde(default)]
    pub next_visit_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// An ad-hoc reminder for a patient, delivered by email on creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub patient_id: String,
    pub full_name: String,
    pub message: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReminderRequest {
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReminderRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum FollowUpError {
    #[error("Follow-up record not found")]
    NotFound,

    #[error("Missing required fields")]
    MissingFields,

    #[error("Invalid date")]
    InvalidDate,

    #[error("Directory store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    #[error("Reminder not found")]
    NotFound,

    #[error("Missing required fields")]
    MissingFields,

    #[error("Patient not found")]
    UnknownPatient,

    #[error("Patient has no email address on file")]
    PatientMissingEmail,

    #[error("Directory store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Accepts a plain calendar date or a full timestamp, keeping the day.
pub(crate) fn parse_day(raw: &str) -> Option<NaiveDate> {
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(day);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.date_naive())
}
