use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Outcomes of a rejected check-in or check-out.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("Outside the permitted area ({distance_meters:.0} m from the site)")]
    OutOfRange { distance_meters: f64 },

    #[error("Already checked in today")]
    DuplicateCheckIn,

    #[error("Already checked out today")]
    DuplicateCheckOut,

    #[error("No check-in found for today")]
    NoCheckInRecord,

    #[error("An absence is already recorded for today")]
    AlreadyAbsent,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AttendanceError {
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceError::OutOfRange { .. } => "out_of_range",
            AttendanceError::DuplicateCheckIn => "duplicate_check_in",
            AttendanceError::DuplicateCheckOut => "duplicate_check_out",
            AttendanceError::NoCheckInRecord => "no_check_in_record",
            AttendanceError::AlreadyAbsent => "already_absent",
            AttendanceError::Store(_) => "internal_error",
        }
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::OutOfRange { .. } | AttendanceError::NoCheckInRecord => {
                StatusCode::BAD_REQUEST
            }
            AttendanceError::DuplicateCheckIn
            | AttendanceError::DuplicateCheckOut
            | AttendanceError::AlreadyAbsent => StatusCode::CONFLICT,
            AttendanceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_body(self.status_code(), self.code(), self)
    }
}

/// Outcomes of leave and justification submissions and reviews.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("A leave request is already pending")]
    PendingLeaveExists,

    #[error("A justification is already pending")]
    PendingJustificationExists,

    #[error("Insufficient leave balance: {requested} day(s) requested, {available} available")]
    InsufficientLeaveBalance { requested: i64, available: i32 },

    #[error("Only absences and late arrivals can be justified")]
    NotJustifiable,

    #[error("start_date cannot be after end_date")]
    InvalidDateRange,

    #[error("Request was already processed")]
    AlreadyProcessed,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkflowError {
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::PendingLeaveExists => "pending_leave_exists",
            WorkflowError::PendingJustificationExists => "pending_justification_exists",
            WorkflowError::InsufficientLeaveBalance { .. } => "insufficient_leave_balance",
            WorkflowError::NotJustifiable => "not_justifiable",
            WorkflowError::InvalidDateRange => "invalid_date_range",
            WorkflowError::AlreadyProcessed => "already_processed",
            WorkflowError::NotFound(_) => "not_found",
            WorkflowError::Store(_) => "internal_error",
        }
    }
}

impl ResponseError for WorkflowError {
    fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::PendingLeaveExists
            | WorkflowError::PendingJustificationExists
            | WorkflowError::AlreadyProcessed => StatusCode::CONFLICT,
            WorkflowError::InsufficientLeaveBalance { .. }
            | WorkflowError::NotJustifiable
            | WorkflowError::InvalidDateRange => StatusCode::BAD_REQUEST,
            WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
            WorkflowError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_body(self.status_code(), self.code(), self)
    }
}

fn error_body(status: StatusCode, code: &str, err: &dyn std::error::Error) -> HttpResponse {
    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "Store failure");
        "Internal Server Error".to_string()
    } else {
        err.to_string()
    };

    HttpResponse::build(status).json(json!({
        "code": code,
        "message": message
    }))
}
