use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::SchedulingError;
use crate::services::store::DirectoryStore;

/// Fast-path read over the appointments table. This answers the UX question
/// "is the slot probably free" before any side effect runs; the unique
/// index at insert time has the final say, so a stale answer here is
/// harmless.
pub struct AvailabilityChecker {
    store: Arc<dyn DirectoryStore>,
}

impl AvailabilityChecker {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }

    /// True when no appointment occupies the exact (doctor, timestamp)
    /// slot. `exclude` ignores one appointment id so a reschedule does not
    /// collide with itself.
    pub async fn is_available(
        &self,
        doctor_id: &str,
        at: DateTime<Utc>,
        exclude: Option<i64>,
    ) -> Result<bool, SchedulingError> {
        let taken = self
            .store
            .appointment_exists(doctor_id, at, exclude)
            .await
            .map_err(|e| SchedulingError::ServiceUnavailable(e.to_string()))?;
        Ok(!taken)
    }
}
