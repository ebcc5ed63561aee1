pub mod followup;
pub mod reminder;

pub use followup::FollowUpService;
pub use reminder::ReminderService;
