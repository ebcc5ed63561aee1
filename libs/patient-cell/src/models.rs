use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: String,
    pub full_name: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub status: PatientStatus,
}

impl Patient {
    pub fn is_active(&self) -> bool {
        self.status == PatientStatus::Active
    }

    /// Whether this patient can receive outbound notifications.
    pub fn has_email(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatientStatus {
    Active,
    Inactive,
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatientStatus::Active => write!(f, "Active"),
            PatientStatus::Inactive => write!(f, "Inactive"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub patient_id: Option<String>,
    pub full_name: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub phone: String,
    pub email: String,
    pub notes: Option<String>,
    pub status: Option<PatientStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub full_name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Required fields missing")]
    MissingFields,

    #[error("Patient ID {0} already exists")]
    IdAlreadyExists(String),

    #[error("Directory store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
