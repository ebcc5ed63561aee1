use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::future::join_all;
use tokio::sync::mpsc;

use appointment_cell::models::{
    Appointment, AppointmentChanges, NewAppointment, PatientRecord, ScheduleAppointmentRequest,
    SchedulingError, StaffRecord, StaffRole, UpdateAppointmentRequest,
};
use appointment_cell::services::store::{DirectoryStore, StoreError};
use appointment_cell::services::AppointmentSchedulingService;
use notification_cell::{MailError, Mailer, OutboundEmail};

/// In-memory directory enforcing the same unique (doctor_id,
/// appointment_date) constraint the real appointments table carries.
struct MemoryStore {
    patients: HashMap<String, PatientRecord>,
    staff: HashMap<String, StaffRecord>,
    appointments: Mutex<Vec<Appointment>>,
    next_id: AtomicI64,
    unavailable: AtomicBool,
}

impl MemoryStore {
    fn new() -> Self {
        let mut patients = HashMap::new();
        patients.insert(
            "P100".to_string(),
            PatientRecord {
                patient_id: "P100".to_string(),
                full_name: "Jane Doe".to_string(),
                email: Some("jane@example.com".to_string()),
            },
        );
        patients.insert(
            "P200".to_string(),
            PatientRecord {
                patient_id: "P200".to_string(),
                full_name: "No Mail".to_string(),
                email: Some("   ".to_string()),
            },
        );

        let mut staff = HashMap::new();
        staff.insert(
            "DOC1".to_string(),
            StaffRecord {
                user_id: "DOC1".to_string(),
                username: "drsmith".to_string(),
                role: StaffRole::Doctor,
            },
        );
        staff.insert(
            "NUR1".to_string(),
            StaffRecord {
                user_id: "NUR1".to_string(),
                username: "nursejo".to_string(),
                role: StaffRole::Nurse,
            },
        );
        staff.insert(
            "ADM1".to_string(),
            StaffRecord {
                user_id: "ADM1".to_string(),
                username: "admin".to_string(),
                role: StaffRole::Admin,
            },
        );

        Self {
            patients,
            staff,
            appointments: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
            unavailable: AtomicBool::new(false),
        }
    }

    fn go_offline(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn find_patient(&self, patient_id: &str) -> Result<Option<PatientRecord>, StoreError> {
        self.check_online()?;
        Ok(self.patients.get(patient_id).cloned())
    }

    async fn find_staff(&self, user_id: &str) -> Result<Option<StaffRecord>, StoreError> {
        self.check_online()?;
        Ok(self.staff.get(user_id).cloned())
    }

    async fn appointment_exists(
        &self,
        doctor_id: &str,
        at: DateTime<Utc>,
        exclude: Option<i64>,
    ) -> Result<bool, StoreError> {
        self.check_online()?;
        let appointments = self.appointments.lock().unwrap();
        Ok(appointments.iter().any(|a| {
            a.doctor_id == doctor_id && a.appointment_date == at && Some(a.id) != exclude
        }))
    }

    async fn insert_appointment(&self, record: &NewAppointment) -> Result<Appointment, StoreError> {
        self.check_online()?;
        let mut appointments = self.appointments.lock().unwrap();
        let slot_taken = appointments.iter().any(|a| {
            a.doctor_id == record.doctor_id && a.appointment_date == record.appointment_date
        });
        if slot_taken {
            return Err(StoreError::DuplicateSlot);
        }

        let appointment = Appointment {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            patient_id: record.patient_id.clone(),
            patient_name: record.patient_name.clone(),
            doctor_id: record.doctor_id.clone(),
            doctor_username: record.doctor_username.clone(),
            appointment_date: record.appointment_date,
            purpose: record.purpose.clone(),
            status: record.status.clone(),
        };
        appointments.push(appointment.clone());
        Ok(appointment)
    }

    async fn find_appointment(&self, id: i64) -> Result<Option<Appointment>, StoreError> {
        self.check_online()?;
        let appointments = self.appointments.lock().unwrap();
        Ok(appointments.iter().find(|a| a.id == id).cloned())
    }

    async fn list_appointments(&self) -> Result<Vec<Appointment>, StoreError> {
        self.check_online()?;
        Ok(self.appointments.lock().unwrap().clone())
    }

    async fn update_appointment(
        &self,
        id: i64,
        changes: &AppointmentChanges,
    ) -> Result<Appointment, StoreError> {
        self.check_online()?;
        let mut appointments = self.appointments.lock().unwrap();

        let new_doctor = changes.doctor_id.clone();
        let new_date = changes.appointment_date;
        if new_doctor.is_some() || new_date.is_some() {
            let (target_doctor, target_date) = {
                let current = appointments
                    .iter()
                    .find(|a| a.id == id)
                    .ok_or(StoreError::NotFound)?;
                (
                    new_doctor.clone().unwrap_or_else(|| current.doctor_id.clone()),
                    new_date.unwrap_or(current.appointment_date),
                )
            };
            let collision = appointments.iter().any(|a| {
                a.id != id && a.doctor_id == target_doctor && a.appointment_date == target_date
            });
            if collision {
                return Err(StoreError::DuplicateSlot);
            }
        }

        let appointment = appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::NotFound)?;
        if let Some(at) = changes.appointment_date {
            appointment.appointment_date = at;
        }
        if let Some(ref doctor_id) = changes.doctor_id {
            appointment.doctor_id = doctor_id.clone();
        }
        if let Some(ref doctor_username) = changes.doctor_username {
            appointment.doctor_username = doctor_username.clone();
        }
        if let Some(ref purpose) = changes.purpose {
            appointment.purpose = Some(purpose.clone());
        }
        if let Some(ref status) = changes.status {
            appointment.status = status.clone();
        }
        Ok(appointment.clone())
    }

    async fn delete_appointment(&self, id: i64) -> Result<(), StoreError> {
        self.check_online()?;
        let mut appointments = self.appointments.lock().unwrap();
        let before = appointments.len();
        appointments.retain(|a| a.id != id);
        if appointments.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

/// Mailer that reports every send over a channel so tests can await the
/// detached confirmation task without sleeping.
struct RecordingMailer {
    sent: mpsc::UnboundedSender<OutboundEmail>,
    fail: bool,
}

impl RecordingMailer {
    fn new(fail: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<OutboundEmail>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { sent: tx, fail }), rx)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let _ = self.sent.send(email.clone());
        if self.fail {
            return Err(MailError::Api {
                status: 500,
                body: "provider down".to_string(),
            });
        }
        Ok(())
    }
}

fn future_slot() -> String {
    (Utc::now() + ChronoDuration::days(7))
        .format("%Y-%m-%dT10:00:00Z")
        .to_string()
}

fn booking(patient_id: &str, doctor_id: &str, doctor_username: &str, date: &str) -> ScheduleAppointmentRequest {
    ScheduleAppointmentRequest {
        patient_id: Some(patient_id.to_string()),
        patient_name: None,
        appointment_date: Some(date.to_string()),
        doctor_id: Some(doctor_id.to_string()),
        doctor_username: Some(doctor_username.to_string()),
        purpose: Some("Checkup".to_string()),
        status: Some("Scheduled".to_string()),
    }
}

fn service_with(
    store: Arc<MemoryStore>,
    mailer: Arc<RecordingMailer>,
    revalidate: bool,
) -> AppointmentSchedulingService {
    AppointmentSchedulingService::new(store, mailer, revalidate)
}

async fn next_email(rx: &mut mpsc::UnboundedReceiver<OutboundEmail>) -> OutboundEmail {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("confirmation email was never attempted")
        .expect("mailer channel closed")
}

#[tokio::test]
async fn books_a_free_slot_and_sends_confirmation() {
    let store = Arc::new(MemoryStore::new());
    let (mailer, mut rx) = RecordingMailer::new(false);
    let service = service_with(Arc::clone(&store), mailer, false);
    let slot = future_slot();

    let appointment = service
        .schedule_appointment(&booking("P100", "DOC1", "drsmith", &slot))
        .await
        .unwrap();

    assert_eq!(appointment.patient_id, "P100");
    assert_eq!(appointment.doctor_username, "drsmith");
    assert_eq!(appointment.status, "Scheduled");

    let email = next_email(&mut rx).await;
    assert_eq!(email.to, "jane@example.com");
    assert!(email.html_body.contains("drsmith"));

    // The slot now reads as taken.
    let available = service
        .check_availability(Some("DOC1"), Some(&slot))
        .await
        .unwrap();
    assert!(!available);
}

#[tokio::test]
async fn patient_name_comes_from_the_directory_not_the_request() {
    let store = Arc::new(MemoryStore::new());
    let (mailer, _rx) = RecordingMailer::new(false);
    let service = service_with(store, mailer, false);

    let mut request = booking("P100", "DOC1", "drsmith", &future_slot());
    request.patient_name = Some("Totally Different Name".to_string());

    let appointment = service.schedule_appointment(&request).await.unwrap();
    assert_eq!(appointment.patient_name, "Jane Doe");
}

#[tokio::test]
async fn rejects_missing_fields_before_anything_else() {
    let store = Arc::new(MemoryStore::new());
    let (mailer, _rx) = RecordingMailer::new(false);
    let service = service_with(store, mailer, false);

    let mut request = booking("P100", "DOC1", "drsmith", "garbage-date");
    request.doctor_id = Some("   ".to_string());

    // The date is also invalid, but the missing field wins.
    let err = service.schedule_appointment(&request).await.unwrap_err();
    assert_matches!(err, SchedulingError::MissingFields);
}

#[tokio::test]
async fn rejects_unparseable_date() {
    let store = Arc::new(MemoryStore::new());
    let (mailer, _rx) = RecordingMailer::new(false);
    let service = service_with(store, mailer, false);

    let err = service
        .schedule_appointment(&booking("P100", "DOC1", "drsmith", "next tuesday"))
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::InvalidDate);
}

#[tokio::test]
async fn rejects_past_date() {
    let store = Arc::new(MemoryStore::new());
    let (mailer, _rx) = RecordingMailer::new(false);
    let service = service_with(store, mailer, false);

    let err = service
        .schedule_appointment(&booking("P100", "DOC1", "drsmith", "2020-01-01T10:00:00Z"))
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::PastDate);
}

#[tokio::test]
async fn rejects_unknown_patient() {
    let store = Arc::new(MemoryStore::new());
    let (mailer, _rx) = RecordingMailer::new(false);
    let service = service_with(store, mailer, false);

    let err = service
        .schedule_appointment(&booking("P999", "DOC1", "drsmith", &future_slot()))
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::UnknownPatient);
}

#[tokio::test]
async fn rejects_patient_with_blank_email() {
    let store = Arc::new(MemoryStore::new());
    let (mailer, _rx) = RecordingMailer::new(false);
    let service = service_with(store, mailer, false);

    let err = service
        .schedule_appointment(&booking("P200", "DOC1", "drsmith", &future_slot()))
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::PatientMissingEmail);
}

#[tokio::test]
async fn rejects_unknown_staff() {
    let store = Arc::new(MemoryStore::new());
    let (mailer, _rx) = RecordingMailer::new(false);
    let service = service_with(store, mailer, false);

    let err = service
        .schedule_appointment(&booking("P100", "DOC9", "drsmith", &future_slot()))
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::UnknownStaff);
}

#[tokio::test]
async fn rejects_admin_as_booking_target() {
    let store = Arc::new(MemoryStore::new());
    let (mailer, _rx) = RecordingMailer::new(false);
    let service = service_with(store, mailer, false);

    let err = service
        .schedule_appointment(&booking("P100", "ADM1", "admin", &future_slot()))
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::WrongRole);
}

#[tokio::test]
async fn rejects_stale_doctor_username() {
    let store = Arc::new(MemoryStore::new());
    let (mailer, _rx) = RecordingMailer::new(false);
    let service = service_with(store, mailer, false);

    let err = service
        .schedule_appointment(&booking("P100", "DOC1", "old-username", &future_slot()))
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::UsernameMismatch);
}

#[tokio::test]
async fn second_booking_for_same_slot_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let (mailer, _rx) = RecordingMailer::new(false);
    let service = service_with(store, mailer, false);
    let slot = future_slot();

    service
        .schedule_appointment(&booking("P100", "DOC1", "drsmith", &slot))
        .await
        .unwrap();

    let err = service
        .schedule_appointment(&booking("P100", "DOC1", "drsmith", &slot))
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::SlotTaken);

    // A different doctor at the same time is still fine.
    service
        .schedule_appointment(&booking("P100", "NUR1", "nursejo", &slot))
        .await
        .unwrap();
}

#[tokio::test]
async fn concurrent_identical_bookings_have_exactly_one_winner() {
    let store = Arc::new(MemoryStore::new());
    let (mailer, _rx) = RecordingMailer::new(false);
    let service = Arc::new(service_with(Arc::clone(&store), mailer, false));
    let slot = future_slot();

    let attempts = (0..16).map(|_| {
        let service = Arc::clone(&service);
        let slot = slot.clone();
        async move {
            service
                .schedule_appointment(&booking("P100", "DOC1", "drsmith", &slot))
                .await
        }
    });

    let results = join_all(attempts).await;

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one booking may claim the slot");
    for result in results {
        if let Err(e) = result {
            assert_matches!(e, SchedulingError::SlotTaken);
        }
    }
    assert_eq!(store.list_appointments().await.unwrap().len(), 1);
}

#[tokio::test]
async fn mail_failure_does_not_fail_the_booking() {
    let store = Arc::new(MemoryStore::new());
    let (mailer, mut rx) = RecordingMailer::new(true);
    let service = service_with(store, mailer, false);

    let appointment = service
        .schedule_appointment(&booking("P100", "DOC1", "drsmith", &future_slot()))
        .await
        .unwrap();
    assert_eq!(appointment.patient_id, "P100");

    // The send was attempted even though it failed.
    let email = next_email(&mut rx).await;
    assert_eq!(email.to, "jane@example.com");
}

#[tokio::test]
async fn store_outage_maps_to_service_unavailable() {
    let store = Arc::new(MemoryStore::new());
    let (mailer, _rx) = RecordingMailer::new(false);
    let service = service_with(Arc::clone(&store), mailer, false);
    store.go_offline();

    let err = service
        .schedule_appointment(&booking("P100", "DOC1", "drsmith", &future_slot()))
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::ServiceUnavailable(_));
}

#[tokio::test]
async fn reschedule_without_revalidation_can_move_onto_a_taken_slot() {
    let store = Arc::new(MemoryStore::new());
    let (mailer, _rx) = RecordingMailer::new(false);
    let service = service_with(Arc::clone(&store), mailer, false);
    let slot_a = future_slot();
    let slot_b = (Utc::now() + ChronoDuration::days(8))
        .format("%Y-%m-%dT10:00:00Z")
        .to_string();

    service
        .schedule_appointment(&booking("P100", "DOC1", "drsmith", &slot_a))
        .await
        .unwrap();
    let second = service
        .schedule_appointment(&booking("P100", "DOC1", "drsmith", &slot_b))
        .await
        .unwrap();

    // The store's own constraint still refuses it even with the fast
    // path disabled.
    let err = service
        .update_appointment(
            second.id,
            &UpdateAppointmentRequest {
                appointment_date: Some(slot_a),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::SlotTaken);
}

#[tokio::test]
async fn reschedule_with_revalidation_excludes_itself() {
    let store = Arc::new(MemoryStore::new());
    let (mailer, _rx) = RecordingMailer::new(false);
    let service = service_with(Arc::clone(&store), mailer, true);
    let slot = future_slot();

    let appointment = service
        .schedule_appointment(&booking("P100", "DOC1", "drsmith", &slot))
        .await
        .unwrap();

    // Re-confirming the same slot for the same appointment must not be a
    // collision with itself.
    let updated = service
        .update_appointment(
            appointment.id,
            &UpdateAppointmentRequest {
                appointment_date: Some(slot),
                status: Some("Confirmed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, "Confirmed");
}

#[tokio::test]
async fn updating_missing_appointment_reports_not_found() {
    let store = Arc::new(MemoryStore::new());
    let (mailer, _rx) = RecordingMailer::new(false);
    let service = service_with(store, mailer, false);

    let err = service
        .update_appointment(
            42,
            &UpdateAppointmentRequest {
                status: Some("Completed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::UnknownAppointment);

    let store = Arc::new(MemoryStore::new());
    let (mailer, _rx) = RecordingMailer::new(false);
    let service = service_with(store, mailer, false);
    let err = service.delete_appointment(42).await.unwrap_err();
    assert_matches!(err, SchedulingError::UnknownAppointment);
}

#[tokio::test]
async fn availability_probe_validates_its_inputs() {
    let store = Arc::new(MemoryStore::new());
    let (mailer, _rx) = RecordingMailer::new(false);
    let service = service_with(store, mailer, false);

    let err = service.check_availability(None, Some("2026-09-14T10:00:00Z")).await.unwrap_err();
    assert_matches!(err, SchedulingError::MissingFields);

    let err = service.check_availability(Some("DOC1"), Some("nope")).await.unwrap_err();
    assert_matches!(err, SchedulingError::InvalidDate);

    let free = service
        .check_availability(Some("DOC1"), Some("2026-09-14T10:00:00Z"))
        .await
        .unwrap();
    assert!(free);
}
