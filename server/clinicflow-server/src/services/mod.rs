pub mod audit;
pub mod directory;

pub use audit::AuditService;
pub use directory::{PatientDirectory, PgDirectory, StaffDirectory};
