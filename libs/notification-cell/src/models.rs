use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single outbound email, ready to hand to a [`crate::Mailer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail delivery is not configured")]
    NotConfigured,

    #[error("mail request failed: {0}")]
    Transport(reqwest::Error),

    #[error("mail request timed out")]
    Timeout,

    #[error("mail API error ({status}): {body}")]
    Api { status: u16, body: String },
}

impl OutboundEmail {
    /// Confirmation sent to the patient right after a booking commits.
    pub fn appointment_confirmation(
        to: &str,
        patient_name: &str,
        doctor_username: &str,
        appointment_date: DateTime<Utc>,
        purpose: Option<&str>,
        status: &str,
    ) -> Self {
        Self {
            to: to.to_string(),
            subject: "Appointment Scheduled".to_string(),
            html_body: format!(
                "<h3>Appointment Confirmation</h3>\
                 <p>Dear {},</p>\
                 <p>Your appointment is scheduled for <b>{}</b> with <b>{}</b>.</p>\
                 <p>Purpose: {}</p>\
                 <p>Status: {}</p>",
                patient_name,
                appointment_date.format("%Y-%m-%d %H:%M UTC"),
                doctor_username,
                purpose.unwrap_or("Not specified"),
                status,
            ),
        }
    }

    /// Ad-hoc reminder message for a patient.
    pub fn reminder(to: &str, patient_name: &str, message: &str, status: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Reminder Notification".to_string(),
            html_body: format!(
                "<p>Dear {},</p>\
                 <p>You have a reminder:</p>\
                 <p>{}</p>\
                 <p>Status: {}</p>",
                patient_name, message, status,
            ),
        }
    }

    /// Notice that a follow-up record was added for the patient.
    pub fn followup_recorded(to: &str, patient_name: &str, next_visit: Option<&str>) -> Self {
        Self {
            to: to.to_string(),
            subject: "Follow-up Record Added".to_string(),
            html_body: format!(
                "<p>Dear {}, your follow-up record has been added. Next visit: {}.</p>",
                patient_name,
                next_visit.unwrap_or("N/A"),
            ),
        }
    }
}
