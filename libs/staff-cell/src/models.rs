use serde::{Deserialize, Serialize};
use std::fmt;

/// A staff account as stored in the `users` table. Only Doctor and Nurse
/// roles are valid targets for appointment bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: i64,
    pub user_id: String,
    pub fullname: String,
    pub role: StaffRole,
    pub username: String,
    pub email: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaffRole {
    Doctor,
    Nurse,
    Admin,
}

impl StaffRole {
    /// Whether this role can be booked against as an appointment's doctor.
    pub fn is_schedulable(&self) -> bool {
        matches!(self, StaffRole::Doctor | StaffRole::Nurse)
    }

    /// Business-key prefix used when generating a new user ID.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            StaffRole::Doctor => "DOC",
            StaffRole::Nurse => "NUR",
            StaffRole::Admin => "ADM",
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaffRole::Doctor => write!(f, "Doctor"),
            StaffRole::Nurse => write!(f, "Nurse"),
            StaffRole::Admin => write!(f, "Admin"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStaffRequest {
    pub user_id: Option<String>,
    pub fullname: String,
    pub role: StaffRole,
    pub username: String,
    pub email: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStaffRequest {
    pub fullname: Option<String>,
    pub role: Option<StaffRole>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StaffError {
    #[error("Staff member not found")]
    NotFound,

    #[error("Missing required fields")]
    MissingFields,

    #[error("Username {0} is already taken")]
    UsernameTaken(String),

    #[error("Directory store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
