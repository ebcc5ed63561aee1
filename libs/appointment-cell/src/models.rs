use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use staff_cell::models::StaffRole;

/// A booked appointment as stored in the `appointments` table.
///
/// `patient_name` and `doctor_username` are denormalized copies taken from
/// the directory rows at write time, so a later rename does not rewrite
/// history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: String,
    pub patient_name: String,
    pub doctor_id: String,
    pub doctor_username: String,
    pub appointment_date: DateTime<Utc>,
    pub purpose: Option<String>,
    pub status: String,
}

/// Insert payload for a new booking. The `id` is assigned by the store.
#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub patient_id: String,
    pub patient_name: String,
    pub doctor_id: String,
    pub doctor_username: String,
    pub appointment_date: DateTime<Utc>,
    pub purpose: Option<String>,
    pub status: String,
}

/// Booking request as it arrives over the wire. The date stays a string
/// until validation parses it; every field is optional at the parse stage
/// so presence can be reported as a single missing-fields error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleAppointmentRequest {
    #[serde(default, rename = "patientID")]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub appointment_date: Option<String>,
    #[serde(default, rename = "doctorID")]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub doctor_username: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    #[serde(default, rename = "doctorID")]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub appointment_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub available: bool,
}

/// Partial update for an existing appointment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    #[serde(default)]
    pub appointment_date: Option<String>,
    #[serde(default, rename = "doctorID")]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub doctor_username: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Typed changes handed to the store once the update request has been
/// validated and its date parsed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppointmentChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl AppointmentChanges {
    pub fn is_empty(&self) -> bool {
        self.appointment_date.is_none()
            && self.doctor_id.is_none()
            && self.doctor_username.is_none()
            && self.purpose.is_none()
            && self.status.is_none()
    }
}

/// Directory view of a patient, as much as scheduling needs to know.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    pub patient_id: String,
    pub full_name: String,
    pub email: Option<String>,
}

impl PatientRecord {
    /// A blank or whitespace-only email counts as missing.
    pub fn contact_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}

/// Directory view of a staff account, enough to vet a booking target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffRecord {
    pub user_id: String,
    pub username: String,
    pub role: StaffRole,
}

/// Everything that can go wrong while taking a booking, in the order the
/// checks run. Handlers map these onto HTTP statuses.
#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("Missing required fields")]
    MissingFields,

    #[error("Invalid appointment date")]
    InvalidDate,

    #[error("Appointment date must be in the future")]
    PastDate,

    #[error("Invalid patient ID")]
    UnknownPatient,

    #[error("Patient has no email address on file")]
    PatientMissingEmail,

    #[error("Invalid doctor or nurse ID")]
    UnknownStaff,

    #[error("Selected user is not a doctor or nurse")]
    WrongRole,

    #[error("Doctor username does not match the user record")]
    UsernameMismatch,

    #[error("Doctor is not available at the selected time")]
    SlotTaken,

    #[error("Appointment not found")]
    UnknownAppointment,

    #[error("Scheduling directory unavailable: {0}")]
    ServiceUnavailable(String),
}
