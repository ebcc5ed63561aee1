use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::{info, warn};

use notification_cell::{HttpMailer, Mailer, OutboundEmail};
use shared_config::AppConfig;

use crate::models::{
    Appointment, AppointmentChanges, NewAppointment, ScheduleAppointmentRequest, SchedulingError,
    UpdateAppointmentRequest,
};
use crate::services::availability::AvailabilityChecker;
use crate::services::store::{DirectoryStore, StoreError, SupabaseDirectoryStore};

/// Accepted wire formats for the appointment timestamp: RFC 3339 and the
/// naive `datetime-local` shapes browsers emit. Naive values are taken as
/// UTC.
pub(crate) fn parse_appointment_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

fn required(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn store_unavailable(err: StoreError) -> SchedulingError {
    SchedulingError::ServiceUnavailable(err.to_string())
}

/// Orchestrates a booking end to end: validation, directory lookups, the
/// availability fast path, the guarded insert, and the post-commit
/// confirmation email.
pub struct AppointmentSchedulingService {
    store: Arc<dyn DirectoryStore>,
    availability: AvailabilityChecker,
    mailer: Arc<dyn Mailer>,
    revalidate_on_reschedule: bool,
}

impl AppointmentSchedulingService {
    pub fn new(
        store: Arc<dyn DirectoryStore>,
        mailer: Arc<dyn Mailer>,
        revalidate_on_reschedule: bool,
    ) -> Self {
        Self {
            availability: AvailabilityChecker::new(Arc::clone(&store)),
            store,
            mailer,
            revalidate_on_reschedule,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(SupabaseDirectoryStore::new(config)),
            Arc::new(HttpMailer::new(config)),
            config.reschedule_revalidates,
        )
    }

    /// Take a booking. The checks run in a fixed order so a request with
    /// several problems always reports the same one. Only the insert step
    /// has a side effect; everything before it can fail cleanly.
    pub async fn schedule_appointment(
        &self,
        request: &ScheduleAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        let patient_id = required(&request.patient_id);
        let raw_date = required(&request.appointment_date);
        let doctor_id = required(&request.doctor_id);
        let doctor_username = required(&request.doctor_username);
        let status = required(&request.status);

        let (Some(patient_id), Some(raw_date), Some(doctor_id), Some(doctor_username), Some(status)) =
            (patient_id, raw_date, doctor_id, doctor_username, status)
        else {
            return Err(SchedulingError::MissingFields);
        };

        let appointment_date =
            parse_appointment_date(raw_date).ok_or(SchedulingError::InvalidDate)?;
        if appointment_date <= Utc::now() {
            return Err(SchedulingError::PastDate);
        }

        let patient = self
            .store
            .find_patient(patient_id)
            .await
            .map_err(store_unavailable)?
            .ok_or(SchedulingError::UnknownPatient)?;
        let patient_email = patient
            .contact_email()
            .ok_or(SchedulingError::PatientMissingEmail)?
            .to_string();

        let staff = self
            .store
            .find_staff(doctor_id)
            .await
            .map_err(store_unavailable)?
            .ok_or(SchedulingError::UnknownStaff)?;
        if !staff.role.is_schedulable() {
            return Err(SchedulingError::WrongRole);
        }
        if staff.username != doctor_username {
            return Err(SchedulingError::UsernameMismatch);
        }

        // Fast-path read. The unique index on (doctor_id, appointment_date)
        // is the authoritative check at insert time.
        if !self
            .availability
            .is_available(doctor_id, appointment_date, None)
            .await?
        {
            return Err(SchedulingError::SlotTaken);
        }

        let record = NewAppointment {
            patient_id: patient.patient_id.clone(),
            // Always the directory's current name, never the client's copy.
            patient_name: patient.full_name.clone(),
            doctor_id: staff.user_id.clone(),
            doctor_username: staff.username.clone(),
            appointment_date,
            purpose: request.purpose.clone().filter(|p| !p.trim().is_empty()),
            status: status.to_string(),
        };

        let appointment = match self.store.insert_appointment(&record).await {
            Ok(appointment) => appointment,
            Err(StoreError::DuplicateSlot) => return Err(SchedulingError::SlotTaken),
            Err(e) => return Err(store_unavailable(e)),
        };

        info!(
            "Appointment {} booked for patient {} with {}",
            appointment.id, appointment.patient_id, appointment.doctor_username
        );
        self.dispatch_confirmation(&appointment, &patient_email);

        Ok(appointment)
    }

    /// Availability probe for the booking form. A taken slot is a normal
    /// `false` answer here, not an error.
    pub async fn check_availability(
        &self,
        doctor_id: Option<&str>,
        raw_date: Option<&str>,
    ) -> Result<bool, SchedulingError> {
        let doctor_id = doctor_id
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(SchedulingError::MissingFields)?;
        let raw_date = raw_date
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(SchedulingError::MissingFields)?;

        let at = parse_appointment_date(raw_date).ok_or(SchedulingError::InvalidDate)?;
        self.availability.is_available(doctor_id, at, None).await
    }

    pub async fn list_appointments(&self) -> Result<Vec<Appointment>, SchedulingError> {
        self.store.list_appointments().await.map_err(store_unavailable)
    }

    /// Apply a partial update. When a reschedule moves the doctor or the
    /// timestamp and revalidation is enabled, the target slot is probed
    /// first, excluding the appointment itself.
    pub async fn update_appointment(
        &self,
        id: i64,
        request: &UpdateAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        let appointment_date = match required(&request.appointment_date) {
            Some(raw) => Some(parse_appointment_date(raw).ok_or(SchedulingError::InvalidDate)?),
            None => None,
        };

        let changes = AppointmentChanges {
            appointment_date,
            doctor_id: required(&request.doctor_id).map(str::to_string),
            doctor_username: required(&request.doctor_username).map(str::to_string),
            purpose: request.purpose.clone(),
            status: required(&request.status).map(str::to_string),
        };
        if changes.is_empty() {
            return Err(SchedulingError::MissingFields);
        }

        let current = self
            .store
            .find_appointment(id)
            .await
            .map_err(store_unavailable)?
            .ok_or(SchedulingError::UnknownAppointment)?;

        let slot_moved = changes.appointment_date.is_some() || changes.doctor_id.is_some();
        if self.revalidate_on_reschedule && slot_moved {
            let doctor_id = changes.doctor_id.as_deref().unwrap_or(&current.doctor_id);
            let at = changes.appointment_date.unwrap_or(current.appointment_date);
            if !self.availability.is_available(doctor_id, at, Some(id)).await? {
                return Err(SchedulingError::SlotTaken);
            }
        }

        match self.store.update_appointment(id, &changes).await {
            Ok(appointment) => Ok(appointment),
            Err(StoreError::DuplicateSlot) => Err(SchedulingError::SlotTaken),
            Err(StoreError::NotFound) => Err(SchedulingError::UnknownAppointment),
            Err(e) => Err(store_unavailable(e)),
        }
    }

    pub async fn delete_appointment(&self, id: i64) -> Result<(), SchedulingError> {
        match self.store.delete_appointment(id).await {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound) => Err(SchedulingError::UnknownAppointment),
            Err(e) => Err(store_unavailable(e)),
        }
    }

    /// Best-effort confirmation email, detached from the request so a slow
    /// or broken mail provider never delays or fails the booking response.
    fn dispatch_confirmation(&self, appointment: &Appointment, email: &str) {
        let mailer = Arc::clone(&self.mailer);
        let message = OutboundEmail::appointment_confirmation(
            email,
            &appointment.patient_name,
            &appointment.doctor_username,
            appointment.appointment_date,
            appointment.purpose.as_deref(),
            &appointment.status,
        );
        let appointment_id = appointment.id;

        tokio::spawn(async move {
            match mailer.send(&message).await {
                Ok(()) => info!("Confirmation email sent for appointment {}", appointment_id),
                Err(e) => warn!(
                    "Confirmation email for appointment {} failed: {}",
                    appointment_id, e
                ),
            }
        });
    }
}
