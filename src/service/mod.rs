pub mod attendance;
pub mod justification;
pub mod leave;
pub mod sweeper;

pub use attendance::{AttendanceKind, AttendanceService, SitePolicy};
pub use justification::JustificationService;
pub use leave::{LeaveService, LeaveSubmission};
pub use sweeper::{AbsenceSweeper, SweepReport};
