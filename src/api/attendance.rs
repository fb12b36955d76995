use crate::api::{Filter, FilterValue, Pagination};
use crate::auth::auth::AuthUser;
use crate::model::attendance::{
    ATTENDANCE_COLUMNS, AttendanceRecord, AttendanceRow, Coordinates, ReportMark,
};
use crate::service::{AbsenceSweeper, AttendanceKind, AttendanceService};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, MySqlPool};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CheckRequest {
    /// Reported by the device
    #[schema(example = -5.224747)]
    pub latitude: f64,
    #[schema(example = -80.630393)]
    pub longitude: f64,
}

/// Attendance record with map links for the recorded positions.
#[derive(Serialize, ToSchema)]
pub struct AttendanceView {
    #[serde(flatten)]
    pub record: AttendanceRecord,
    #[schema(example = "https://www.google.com/maps?q=-5.224747,-80.630393")]
    pub check_in_map: Option<String>,
    pub check_out_map: Option<String>,
}

impl From<AttendanceRecord> for AttendanceView {
    fn from(record: AttendanceRecord) -> Self {
        Self {
            check_in_map: record.check_in_at.map(|c| c.map_link()),
            check_out_map: record.check_out_at.map(|c| c.map_link()),
            record,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<AttendanceView>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct AttendanceFilter {
    /// Filter by worker ID (admin only)
    #[schema(example = 7)]
    pub worker_id: Option<u64>,
    /// Filter by status
    #[schema(example = "late")]
    pub status: Option<String>,
    /// Earliest date, inclusive
    #[schema(example = "2026-03-01", format = "date", value_type = Option<String>)]
    pub from: Option<NaiveDate>,
    /// Latest date, inclusive
    #[schema(example = "2026-03-31", format = "date", value_type = Option<String>)]
    pub to: Option<NaiveDate>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct ReportEntry {
    pub worker_id: u64,
    #[schema(example = "Ana Quispe")]
    pub worker_name: String,
    #[schema(example = "2026-03-02", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "08:12:40", value_type = Option<String>)]
    pub check_in: Option<NaiveTime>,
    #[schema(example = "17:02:10", value_type = Option<String>)]
    pub check_out: Option<NaiveTime>,
    pub mark: ReportMark,
}

#[derive(Default, Serialize, ToSchema)]
pub struct ReportTotals {
    pub attended: u32,
    pub late: u32,
    pub justified: u32,
    pub absent: u32,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceReport {
    pub entries: Vec<ReportEntry>,
    pub totals: ReportTotals,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ReportFilter {
    /// Worker to report on. Employees always get their own report.
    pub worker_id: Option<u64>,
    #[schema(example = "2026-03-01", format = "date", value_type = Option<String>)]
    pub from: Option<NaiveDate>,
    #[schema(example = "2026-03-31", format = "date", value_type = Option<String>)]
    pub to: Option<NaiveDate>,
}

#[derive(FromRow)]
struct ReportRow {
    #[sqlx(flatten)]
    attendance: AttendanceRow,
    first_name: String,
    last_name: String,
}

#[derive(Serialize, ToSchema)]
pub struct ServerTime {
    #[schema(example = "2026-03-02T08:12:40-05:00")]
    pub now: String,
    #[schema(example = "2026-03-02", value_type = String, format = "date")]
    pub date: NaiveDate,
    pub site: Coordinates,
    #[schema(example = 100.0)]
    pub radius_meters: f64,
}

/* =========================
Check-in / check-out
========================= */
/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body = CheckRequest,
    responses(
        (status = 200, description = "Checked in", body = AttendanceView),
        (status = 400, description = "Outside the permitted area", body = Object, example = json!({
            "code": "out_of_range",
            "message": "Outside the permitted area (250 m from the site)"
        })),
        (status = 409, description = "Already checked in, or marked absent", body = Object, example = json!({
            "code": "duplicate_check_in",
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    payload: web::Json<CheckRequest>,
) -> actix_web::Result<impl Responder> {
    register(auth, service, payload, AttendanceKind::CheckIn).await
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    request_body = CheckRequest,
    responses(
        (status = 200, description = "Checked out", body = AttendanceView),
        (status = 400, description = "No check-in today, or outside the permitted area", body = Object, example = json!({
            "code": "no_check_in_record",
            "message": "No check-in found for today"
        })),
        (status = 409, description = "Already checked out, or marked absent", body = Object, example = json!({
            "code": "duplicate_check_out",
            "message": "Already checked out today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    payload: web::Json<CheckRequest>,
) -> actix_web::Result<impl Responder> {
    register(auth, service, payload, AttendanceKind::CheckOut).await
}

async fn register(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    payload: web::Json<CheckRequest>,
    kind: AttendanceKind,
) -> actix_web::Result<HttpResponse> {
    let at = Coordinates::new(payload.latitude, payload.longitude);
    let record = service
        .register_attendance(auth.worker_id, kind, at)
        .await?;

    Ok(HttpResponse::Ok().json(AttendanceView::from(record)))
}

/// Caller's record for today, if any
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's record", body = AttendanceView),
        (status = 404, description = "Nothing recorded today"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
) -> actix_web::Result<impl Responder> {
    match service.today(auth.worker_id).await? {
        Some(record) => Ok(HttpResponse::Ok().json(AttendanceView::from(record))),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Nothing recorded today"
        }))),
    }
}

/// Trusted server time used for attendance decisions
#[utoipa::path(
    get,
    path = "/api/time",
    responses(
        (status = 200, description = "Server time and site", body = ServerTime),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn server_time(
    _auth: AuthUser,
    service: web::Data<AttendanceService>,
) -> actix_web::Result<impl Responder> {
    let now = service.now();
    let fence = service.policy().fence;

    Ok(HttpResponse::Ok().json(ServerTime {
        now: now.to_rfc3339(),
        date: now.date_naive(),
        site: fence.center,
        radius_meters: fence.radius_meters,
    }))
}

/* =========================
Listings
========================= */
async fn fetch_page(
    pool: &MySqlPool,
    filter: &Filter<'_>,
    pagination: &Pagination,
) -> actix_web::Result<AttendanceListResponse> {
    let count_sql = format!("SELECT COUNT(*) FROM attendance{}", filter.sql);
    let total = filter
        .bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to count attendance");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let data_sql = format!(
        "SELECT {ATTENDANCE_COLUMNS} FROM attendance{} ORDER BY date DESC, id DESC LIMIT ? OFFSET ?",
        filter.sql
    );
    let rows = filter
        .bind_rows(sqlx::query_as::<_, AttendanceRow>(&data_sql))
        .bind(pagination.per_page)
        .bind(pagination.offset)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch attendance");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let data = rows
        .into_iter()
        .map(|row| AttendanceRecord::try_from(row).map(AttendanceView::from))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            tracing::error!(error = %e, "Unreadable attendance row");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(AttendanceListResponse {
        data,
        page: u32::try_from(pagination.page).unwrap_or(u32::MAX),
        per_page: u32::try_from(pagination.per_page).unwrap_or(u32::MAX),
        total,
    })
}

/// Caller's own attendance history
#[utoipa::path(
    get,
    path = "/api/attendance/me",
    params(AttendanceFilter),
    responses(
        (status = 200, description = "Paginated attendance", body = AttendanceListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn my_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceFilter>,
) -> actix_web::Result<impl Responder> {
    let pagination = Pagination::new(query.page, query.per_page);

    let mut filter = Filter::new();
    filter.push("worker_id = ?", FilterValue::U64(auth.worker_id));
    if let Some(status) = query.status.as_deref() {
        filter.push("status = ?", FilterValue::Str(status));
    }
    filter.date_range("date", query.from, query.to);

    let response = fetch_page(pool.get_ref(), &filter, &pagination).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// All workers' attendance (admin)
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceFilter),
    responses(
        (status = 200, description = "Paginated attendance", body = AttendanceListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn attendance_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let pagination = Pagination::new(query.page, query.per_page);

    let mut filter = Filter::new();
    if let Some(worker_id) = query.worker_id {
        filter.push("worker_id = ?", FilterValue::U64(worker_id));
    }
    if let Some(status) = query.status.as_deref() {
        filter.push("status = ?", FilterValue::Str(status));
    }
    filter.date_range("date", query.from, query.to);

    let response = fetch_page(pool.get_ref(), &filter, &pagination).await?;
    Ok(HttpResponse::Ok().json(response))
}

/* =========================
Report
========================= */
fn build_report(rows: Vec<(String, AttendanceRecord)>) -> AttendanceReport {
    let mut totals = ReportTotals::default();
    let entries = rows
        .into_iter()
        .map(|(worker_name, record)| {
            let mark = ReportMark::for_record(&record);
            match mark {
                ReportMark::Attended => totals.attended += 1,
                ReportMark::Late => totals.late += 1,
                ReportMark::Justified => totals.justified += 1,
                ReportMark::Absent => totals.absent += 1,
            }
            ReportEntry {
                worker_id: record.worker_id,
                worker_name,
                date: record.date,
                check_in: record.check_in,
                check_out: record.check_out,
                mark,
            }
        })
        .collect();

    AttendanceReport { entries, totals }
}

/// Attendance report with one mark per day
#[utoipa::path(
    get,
    path = "/api/attendance/report",
    params(ReportFilter),
    responses(
        (status = 200, description = "Report", body = AttendanceReport),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn attendance_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ReportFilter>,
) -> actix_web::Result<impl Responder> {
    let worker_id = match query.worker_id {
        Some(id) => {
            auth.require_self_or_admin(id)?;
            Some(id)
        }
        None if auth.is_admin() => None,
        None => Some(auth.worker_id),
    };

    let mut filter = Filter::new();
    if let Some(worker_id) = worker_id {
        filter.push("a.worker_id = ?", FilterValue::U64(worker_id));
    }
    filter.date_range("a.date", query.from, query.to);

    let sql = format!(
        r#"
        SELECT a.id, a.worker_id, a.date, a.check_in, a.check_in_lat, a.check_in_lon,
               a.check_out, a.check_out_lat, a.check_out_lon, a.status,
               w.first_name, w.last_name
        FROM attendance a
        JOIN workers w ON w.id = a.worker_id
        {}
        ORDER BY a.date, w.last_name, w.first_name
        "#,
        filter.sql
    );

    let rows = filter
        .bind_rows(sqlx::query_as::<_, ReportRow>(&sql))
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch attendance report");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let rows = rows
        .into_iter()
        .map(|row| {
            let name = format!("{} {}", row.first_name, row.last_name);
            AttendanceRecord::try_from(row.attendance).map(|record| (name, record))
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            tracing::error!(error = %e, "Unreadable attendance row");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(build_report(rows)))
}

/* =========================
Absence sweep (admin)
========================= */
/// Runs the absence sweep for today immediately
#[utoipa::path(
    post,
    path = "/api/attendance/sweep",
    responses(
        (status = 200, description = "Sweep finished", body = crate::service::SweepReport),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn run_sweep(
    auth: AuthUser,
    sweeper: web::Data<AbsenceSweeper>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let report = sweeper.sweep_absences().await.map_err(|e| {
        tracing::error!(error = %e, "Manual absence sweep failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    tracing::info!(worker_id = auth.worker_id, created = report.created, "Manual absence sweep");

    Ok(HttpResponse::Ok().json(report))
}
