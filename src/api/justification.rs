use crate::api::attendance::AttendanceView;
use crate::api::leave_request::Decision;
use crate::api::{Filter, FilterValue, Pagination};
use crate::auth::auth::AuthUser;
use crate::model::attendance::{ATTENDANCE_COLUMNS, AttendanceRecord, AttendanceRow, AttendanceStatus};
use crate::model::evidence;
use crate::model::justification::{JUSTIFICATION_COLUMNS, Justification, JustificationRow};
use crate::model::leave_request::RequestStatus;
use crate::service::JustificationService;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateJustification {
    /// Absent or late attendance record being justified
    #[schema(example = 42)]
    pub attendance_id: u64,
    #[schema(example = "Medical appointment")]
    pub description: String,
    /// Base64-encoded attachment
    #[schema(example = "JVBERi0xLjQK", format = "byte", nullable = true)]
    pub evidence: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct JustificationListResponse {
    pub data: Vec<Justification>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct JustificationFilter {
    /// Filter by worker ID (admin only)
    pub worker_id: Option<u64>,
    #[schema(example = "pending")]
    pub status: Option<RequestStatus>,
    /// Submitted on or after
    #[schema(example = "2026-03-01", format = "date", value_type = Option<String>)]
    pub from: Option<NaiveDate>,
    /// Submitted on or before
    #[schema(example = "2026-03-31", format = "date", value_type = Option<String>)]
    pub to: Option<NaiveDate>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Submit a justification for an absence or late arrival
#[utoipa::path(
    post,
    path = "/api/justifications",
    request_body = CreateJustification,
    responses(
        (status = 201, description = "Justification submitted", body = Justification),
        (status = 400, description = "Record cannot be justified", body = Object, example = json!({
            "code": "not_justifiable",
            "message": "Only absences and late arrivals can be justified"
        })),
        (status = 404, description = "Attendance record not found"),
        (status = 409, description = "A justification is already pending"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Justification"
)]
pub async fn create_justification(
    auth: AuthUser,
    service: web::Data<JustificationService>,
    payload: web::Json<CreateJustification>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();

    let evidence = match payload.evidence.as_deref().map(evidence::decode).transpose() {
        Ok(bytes) => bytes,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "evidence must be base64"
            })));
        }
    };

    let justification = service
        .submit(
            auth.worker_id,
            payload.attendance_id,
            payload.description,
            evidence,
        )
        .await?;

    Ok(HttpResponse::Created().json(justification))
}

/// Approve a justification; the attendance record becomes `justified`
#[utoipa::path(
    put,
    path = "/api/justifications/{justification_id}/approve",
    params(
        ("justification_id" = u64, Path, description = "Justification to approve")
    ),
    request_body = Decision,
    responses(
        (status = 200, description = "Approved", body = Justification),
        (status = 404, description = "Justification not found"),
        (status = 409, description = "Already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Justification"
)]
pub async fn approve_justification(
    auth: AuthUser,
    service: web::Data<JustificationService>,
    path: web::Path<u64>,
    payload: web::Json<Decision>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let justification = service.approve(path.into_inner(), &payload.motive).await?;
    Ok(HttpResponse::Ok().json(justification))
}

/// Reject a justification
#[utoipa::path(
    put,
    path = "/api/justifications/{justification_id}/reject",
    params(
        ("justification_id" = u64, Path, description = "Justification to reject")
    ),
    request_body = Decision,
    responses(
        (status = 200, description = "Rejected", body = Justification),
        (status = 404, description = "Justification not found"),
        (status = 409, description = "Already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Justification"
)]
pub async fn reject_justification(
    auth: AuthUser,
    service: web::Data<JustificationService>,
    path: web::Path<u64>,
    payload: web::Json<Decision>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let justification = service.reject(path.into_inner(), &payload.motive).await?;
    Ok(HttpResponse::Ok().json(justification))
}

/// A worker's pending justification, if any (admin)
#[utoipa::path(
    get,
    path = "/api/justifications/pending/{worker_id}",
    params(
        ("worker_id" = u64, Path, description = "Worker to look up")
    ),
    responses(
        (status = 200, description = "Pending justification with base64 evidence", body = Justification),
        (status = 404, description = "No pending justification"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Justification"
)]
pub async fn pending_justification(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let worker_id = path.into_inner();
    let sql = format!(
        "SELECT {JUSTIFICATION_COLUMNS} FROM justifications WHERE worker_id = ? AND status = ? LIMIT 1"
    );
    let justification = sqlx::query_as::<_, JustificationRow>(&sql)
        .bind(worker_id)
        .bind(RequestStatus::Pending.as_ref())
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, worker_id, "Failed to fetch pending justification");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?
        .map(Justification::try_from)
        .transpose()
        .map_err(|e| {
            tracing::error!(error = %e, worker_id, "Unreadable justification");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    match justification {
        Some(data) => Ok(HttpResponse::Ok().json(data)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "No pending justification"
        }))),
    }
}

/// Justifications, all workers for admins or the caller's own otherwise
#[utoipa::path(
    get,
    path = "/api/justifications",
    params(JustificationFilter),
    responses(
        (status = 200, description = "Paginated justifications", body = JustificationListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Justification"
)]
pub async fn justification_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<JustificationFilter>,
) -> actix_web::Result<impl Responder> {
    let pagination = Pagination::new(query.page, query.per_page);

    let mut filter = Filter::new();
    if !auth.is_admin() {
        filter.push("worker_id = ?", FilterValue::U64(auth.worker_id));
    } else if let Some(worker_id) = query.worker_id {
        filter.push("worker_id = ?", FilterValue::U64(worker_id));
    }
    if let Some(status) = query.status.as_ref() {
        filter.push("status = ?", FilterValue::Str(status.as_ref()));
    }
    filter.date_range("submitted_on", query.from, query.to);

    let count_sql = format!("SELECT COUNT(*) FROM justifications{}", filter.sql);
    let total = filter
        .bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to count justifications");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let data_sql = format!(
        "SELECT {JUSTIFICATION_COLUMNS} FROM justifications{} ORDER BY submitted_on DESC, id DESC LIMIT ? OFFSET ?",
        filter.sql
    );
    let data = filter
        .bind_rows(sqlx::query_as::<_, JustificationRow>(&data_sql))
        .bind(pagination.per_page)
        .bind(pagination.offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch justifications");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?
        .into_iter()
        .map(Justification::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            tracing::error!(error = %e, "Unreadable justification");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(JustificationListResponse {
        data,
        page: u32::try_from(pagination.page).unwrap_or(u32::MAX),
        per_page: u32::try_from(pagination.per_page).unwrap_or(u32::MAX),
        total,
    }))
}

/// Caller's absent and late days, newest first
#[utoipa::path(
    get,
    path = "/api/justifications/justifiable",
    responses(
        (status = 200, description = "Records that may be justified", body = [AttendanceView]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Justification"
)]
pub async fn justifiable_records(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let sql = format!(
        "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE worker_id = ? AND status IN (?, ?) ORDER BY date DESC"
    );
    let records = sqlx::query_as::<_, AttendanceRow>(&sql)
        .bind(auth.worker_id)
        .bind(AttendanceStatus::Absent.as_ref())
        .bind(AttendanceStatus::Late.as_ref())
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, worker_id = auth.worker_id, "Failed to fetch justifiable records");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?
        .into_iter()
        .map(|row| AttendanceRecord::try_from(row).map(AttendanceView::from))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            tracing::error!(error = %e, "Unreadable attendance row");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(records))
}
