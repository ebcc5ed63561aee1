pub mod availability;
pub mod scheduling;
pub mod store;

pub use availability::AvailabilityChecker;
pub use scheduling::AppointmentSchedulingService;
pub use store::{DirectoryStore, StoreError, SupabaseDirectoryStore};
