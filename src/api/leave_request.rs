use crate::api::{Filter, FilterValue, Pagination};
use crate::auth::auth::AuthUser;
use crate::model::evidence;
use crate::model::leave_request::{LEAVE_COLUMNS, LeaveRequest, LeaveRow, RequestStatus};
use crate::service::{LeaveService, LeaveSubmission};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use strum_macros::AsRefStr;
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, Deserialize, ToSchema, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Personal,
    Unpaid,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-03-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "sick")]
    pub leave_type: LeaveType, // enum ensures Swagger dropdown
    #[schema(example = "Dental surgery")]
    pub description: String,
    /// Base64-encoded attachment
    #[schema(example = "JVBERi0xLjQK", format = "byte", nullable = true)]
    pub evidence: Option<String>,
}

/// Decision on a pending request
#[derive(Deserialize, ToSchema)]
pub struct Decision {
    #[schema(example = "Approved by line manager")]
    pub motive: String,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Filter by worker ID
    #[schema(example = 7)]
    pub worker_id: Option<u64>,
    /// Filter by status
    #[schema(example = "pending")]
    pub status: Option<RequestStatus>,
    /// Requested on or after
    #[schema(example = "2026-03-01", format = "date", value_type = Option<String>)]
    pub from: Option<NaiveDate>,
    /// Requested on or before
    #[schema(example = "2026-03-31", format = "date", value_type = Option<String>)]
    pub to: Option<NaiveDate>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Pagination per page number
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

/* =========================
Create leave request
========================= */
/// Swagger doc for create_leave endpoint
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "Bad request", body = Object, example = json!({
            "code": "invalid_date_range",
            "message": "start_date cannot be after end_date"
        })),
        (status = 409, description = "A leave request is already pending", body = Object, example = json!({
            "code": "pending_leave_exists",
            "message": "A leave request is already pending"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();

    let evidence = match payload.evidence.as_deref() {
        Some(encoded) => match evidence::decode(encoded) {
            Ok(bytes) => Some(bytes),
            Err(_) => {
                return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                    "message": "evidence must be base64"
                })));
            }
        },
        None => None,
    };

    let leave = service
        .submit(
            auth.worker_id,
            LeaveSubmission {
                start_date: payload.start_date,
                end_date: payload.end_date,
                leave_type: payload.leave_type.as_ref().to_string(),
                description: payload.description,
                evidence,
            },
        )
        .await?;

    Ok(HttpResponse::Created().json(leave))
}

/* =========================
Approve leave (Admin)
========================= */
/// Swagger doc for approve_leave endpoint
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    request_body = Decision,
    responses(
        (status = 200, description = "Leave approved, balance debited", body = LeaveRequest),
        (status = 400, description = "Insufficient leave balance", body = Object, example = json!({
            "code": "insufficient_leave_balance",
            "message": "Insufficient leave balance: 5 day(s) requested, 3 available"
        })),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
    payload: web::Json<Decision>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let leave = service.approve(path.into_inner(), &payload.motive).await?;
    Ok(HttpResponse::Ok().json(leave))
}

/* =========================
Reject leave (Admin)
========================= */
/// Swagger doc for reject_leave endpoint
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    request_body = Decision,
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRequest),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
    payload: web::Json<Decision>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let leave = service.reject(path.into_inner(), &payload.motive).await?;
    Ok(HttpResponse::Ok().json(leave))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "Leave request not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?");
    let leave = sqlx::query_as::<_, LeaveRow>(&sql)
        .bind(leave_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, leave_id, "Failed to fetch leave request");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?
        .map(LeaveRequest::try_from)
        .transpose()
        .map_err(|e| {
            tracing::error!(error = %e, leave_id, "Unreadable leave request");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    match leave {
        Some(data) => {
            auth.require_self_or_admin(data.worker_id)?;
            Ok(HttpResponse::Ok().json(data))
        }
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Leave request not found"
        }))),
    }
}

/// A worker's pending leave request, if any (admin)
#[utoipa::path(
    get,
    path = "/api/leave/pending/{worker_id}",
    params(
        ("worker_id" = u64, Path, description = "Worker to look up")
    ),
    responses(
        (status = 200, description = "Pending request with base64 evidence", body = LeaveRequest),
        (status = 404, description = "No pending request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn pending_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let worker_id = path.into_inner();
    let sql = format!(
        "SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE worker_id = ? AND status = ? LIMIT 1"
    );
    let leave = sqlx::query_as::<_, LeaveRow>(&sql)
        .bind(worker_id)
        .bind(RequestStatus::Pending.as_ref())
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, worker_id, "Failed to fetch pending leave");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?
        .map(LeaveRequest::try_from)
        .transpose()
        .map_err(|e| {
            tracing::error!(error = %e, worker_id, "Unreadable leave request");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    match leave {
        Some(data) => Ok(HttpResponse::Ok().json(data)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "No pending leave request"
        }))),
    }
}

async fn fetch_page(
    pool: &MySqlPool,
    filter: &Filter<'_>,
    pagination: &Pagination,
) -> actix_web::Result<LeaveListResponse> {
    let count_sql = format!("SELECT COUNT(*) FROM leave_requests{}", filter.sql);
    let total = filter
        .bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to count leave requests");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let data_sql = format!(
        r#"
        SELECT {LEAVE_COLUMNS}
        FROM leave_requests
        {}
        ORDER BY requested_on DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
        filter.sql
    );
    let leaves = filter
        .bind_rows(sqlx::query_as::<_, LeaveRow>(&data_sql))
        .bind(pagination.per_page)
        .bind(pagination.offset)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch leave list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?
        .into_iter()
        .map(LeaveRequest::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            tracing::error!(error = %e, "Unreadable leave request");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(LeaveListResponse {
        data: leaves,
        page: u32::try_from(pagination.page).unwrap_or(u32::MAX),
        per_page: u32::try_from(pagination.per_page).unwrap_or(u32::MAX),
        total,
    })
}

fn apply_filter<'a>(filter: &mut Filter<'a>, query: &'a LeaveFilter) {
    if let Some(status) = query.status.as_ref() {
        filter.push("status = ?", FilterValue::Str(status.as_ref()));
    }
    filter.date_range("requested_on", query.from, query.to);
}

/// for getting leave applications endpoint (admin)
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let pagination = Pagination::new(query.page, query.per_page);
    let mut filter = Filter::new();
    if let Some(worker_id) = query.worker_id {
        filter.push("worker_id = ?", FilterValue::U64(worker_id));
    }
    apply_filter(&mut filter, &query);

    let response = fetch_page(pool.get_ref(), &filter, &pagination).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Caller's own leave history
#[utoipa::path(
    get,
    path = "/api/leave/me",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_leaves(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    let pagination = Pagination::new(query.page, query.per_page);
    let mut filter = Filter::new();
    filter.push("worker_id = ?", FilterValue::U64(auth.worker_id));
    apply_filter(&mut filter, &query);

    let response = fetch_page(pool.get_ref(), &filter, &pagination).await?;
    Ok(HttpResponse::Ok().json(response))
}
