pub mod attendance;
pub mod evidence;
pub mod justification;
pub mod leave_request;
pub mod role;
pub mod worker;
