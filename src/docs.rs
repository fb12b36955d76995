use crate::api::attendance::{
    AttendanceFilter, AttendanceListResponse, AttendanceReport, AttendanceView, CheckRequest,
    ReportEntry, ReportFilter, ReportTotals, ServerTime,
};
use crate::api::justification::{
    CreateJustification, JustificationFilter, JustificationListResponse,
};
use crate::api::leave_request::{CreateLeave, Decision, LeaveFilter, LeaveListResponse, LeaveType};
use crate::api::worker::{
    ChangePassword, CreateWorker, UpdateWorker, WorkerListResponse, WorkerQuery,
};
use crate::auth::handlers::{LoginRequest, LoginResponse};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, Coordinates, ReportMark};
use crate::model::justification::Justification;
use crate::model::leave_request::{LeaveRequest, RequestStatus};
use crate::model::role::Role;
use crate::model::worker::{Worker, WorkerStatus};
use crate::service::SweepReport;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

/// Registers the `bearer_auth` scheme referenced by protected paths.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance API",
        version = "1.0.0",
        description = r#"
## Worker Attendance & Leave

Geofenced daily attendance for a single work site, with leave requests and
absence justifications reviewed by administrators.

### Key Features
- **Attendance**
  - Check-in / check-out from the site's GPS perimeter
  - Late arrivals flagged after the configured cutoff
  - Absences recorded automatically every evening
- **Leave Management**
  - Submit, approve or reject leave against the worker's balance
- **Justifications**
  - Justify absences and late arrivals with optional evidence
- **Workers**
  - Register, update and deactivate workers
  - Workers edit their own profile and password

### Security
Endpoints under `/api` require a **JWT Bearer** access token obtained from `/auth/login`.
Review and administration endpoints are restricted to administrators.

### Response Format
- JSON bodies; errors carry `message` and, for domain rejections, a stable `code`
- Pagination supported for list endpoints
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::today,
        crate::api::attendance::server_time,
        crate::api::attendance::my_attendance,
        crate::api::attendance::attendance_list,
        crate::api::attendance::attendance_report,
        crate::api::attendance::run_sweep,

        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::pending_leave,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::my_leaves,

        crate::api::justification::create_justification,
        crate::api::justification::approve_justification,
        crate::api::justification::reject_justification,
        crate::api::justification::pending_justification,
        crate::api::justification::justification_list,
        crate::api::justification::justifiable_records,

        crate::api::worker::register_worker,
        crate::api::worker::list_workers,
        crate::api::worker::get_worker,
        crate::api::worker::update_worker,
        crate::api::worker::deactivate_worker,
        crate::api::worker::my_profile,
        crate::api::worker::update_my_profile,
        crate::api::worker::change_password
    ),
    components(
        schemas(
            LoginRequest,
            LoginResponse,
            CheckRequest,
            Coordinates,
            AttendanceStatus,
            AttendanceRecord,
            AttendanceView,
            AttendanceFilter,
            AttendanceListResponse,
            ReportMark,
            ReportEntry,
            ReportTotals,
            AttendanceReport,
            ReportFilter,
            ServerTime,
            SweepReport,
            RequestStatus,
            LeaveType,
            LeaveRequest,
            CreateLeave,
            Decision,
            LeaveFilter,
            LeaveListResponse,
            Justification,
            CreateJustification,
            JustificationFilter,
            JustificationListResponse,
            Role,
            WorkerStatus,
            Worker,
            CreateWorker,
            UpdateWorker,
            WorkerQuery,
            WorkerListResponse,
            ChangePassword
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and token rotation"),
        (name = "Attendance", description = "Geofenced check-in, check-out and reports"),
        (name = "Leave", description = "Leave requests and approvals"),
        (name = "Justification", description = "Absence and late-arrival justifications"),
        (name = "Worker", description = "Worker administration"),
    )
)]
pub struct ApiDoc;
