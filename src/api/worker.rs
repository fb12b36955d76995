use crate::{
    api::{Filter, FilterValue, Pagination},
    auth::{
        auth::AuthUser,
        password::{hash_password, verify_password},
    },
    config::Config,
    model::{
        role::Role,
        worker::{WORKER_COLUMNS, Worker, WorkerRow, WorkerStatus},
    },
    utils::{
        db_utils::{build_update_sql, execute_update},
        email_cache, email_filter,
    },
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

/// Columns an administrator may change through `PATCH /workers/{id}`.
pub const UPDATABLE_COLUMNS: &[&str] = &[
    "first_name",
    "last_name",
    "phone",
    "document_number",
    "position",
    "hire_date",
];

#[derive(Deserialize, ToSchema)]
pub struct CreateWorker {
    #[schema(example = "Ana")]
    pub first_name: String,
    #[schema(example = "Quispe")]
    pub last_name: String,
    #[schema(example = "ana.quispe@company.com", format = "email")]
    pub email: String,
    #[schema(example = "987654321", nullable = true)]
    pub phone: Option<String>,
    #[schema(example = "70112233", nullable = true)]
    pub document_number: Option<String>,
    #[schema(example = "Warehouse clerk")]
    pub position: String,
    /// Defaults to `employee`
    pub role: Option<Role>,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub hire_date: NaiveDate,
    #[schema(example = "initial-pass-123", format = "password")]
    pub password: String,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct WorkerQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    #[schema(example = "active")]
    pub status: Option<WorkerStatus>,
    pub role: Option<Role>,
    /// Search by name or email
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct WorkerListResponse {
    pub data: Vec<Worker>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 10)]
    pub total: i64,
}

/// Columns a worker may change on their own profile.
pub const SELF_UPDATABLE_COLUMNS: &[&str] = &["first_name", "last_name", "phone"];

pub const MIN_PASSWORD_LEN: usize = 8;

/// Accepted keys for a partial update
#[derive(Deserialize, ToSchema)]
pub struct UpdateWorker {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub document_number: Option<String>,
    pub position: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub hire_date: Option<NaiveDate>,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePassword {
    #[schema(format = "password")]
    pub current_password: String,
    #[schema(example = "new-pass-456", format = "password")]
    pub new_password: String,
}

/// Phone numbers are nine digits.
pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == 9 && phone.bytes().all(|b| b.is_ascii_digit())
}

/// Maps a MySQL duplicate-key message to the field the client must change.
pub fn duplicate_key_message(db_message: &str) -> &'static str {
    if db_message.contains("uq_workers_phone") {
        "Phone already registered"
    } else if db_message.contains("uq_workers_document_number") {
        "Document number already registered"
    } else {
        "Email already registered"
    }
}

async fn contact_taken(
    pool: &MySqlPool,
    column: &'static str,
    value: &str,
    worker_id: u64,
) -> sqlx::Result<bool> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM workers WHERE {column} = ? AND id <> ? LIMIT 1)");
    sqlx::query_scalar::<_, bool>(&sql)
        .bind(value)
        .bind(worker_id)
        .fetch_one(pool)
        .await
}

/// Rejects a malformed phone, or a phone or document number that belongs to
/// another worker. `worker_id` is the row being edited, 0 on registration.
async fn check_contact(
    pool: &MySqlPool,
    phone: Option<&str>,
    document_number: Option<&str>,
    worker_id: u64,
) -> actix_web::Result<Option<HttpResponse>> {
    if phone.is_some_and(|p| !is_valid_phone(p)) {
        return Ok(Some(HttpResponse::BadRequest().json(json!({
            "message": "Phone must be 9 digits"
        }))));
    }

    let candidates = [
        ("phone", phone, "Phone already registered"),
        ("document_number", document_number, "Document number already registered"),
    ];
    for (column, value, message) in candidates {
        let Some(value) = value else { continue };
        let taken = contact_taken(pool, column, value, worker_id)
            .await
            .map_err(|e| {
                error!(error = %e, column, "Failed to check worker contact");
                ErrorInternalServerError("Internal Server Error")
            })?;
        if taken {
            return Ok(Some(HttpResponse::Conflict().json(json!({ "message": message }))));
        }
    }

    Ok(None)
}

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available(email: &str, pool: &MySqlPool) -> bool {
    let email = email_filter::normalize(email);

    // Cuckoo filter: a miss is definitive
    if !email_filter::might_exist(&email) {
        return true;
    }

    // Moka cache: a hit is definitive
    if email_cache::is_taken(&email).await {
        return false;
    }

    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM workers WHERE email = ? LIMIT 1)",
    )
    .bind(&email)
    .fetch_one(pool)
    .await
    .unwrap_or(true); // fail-safe

    if exists {
        email_cache::mark_taken(&email).await;
    }

    !exists
}

fn read_worker(row: WorkerRow) -> actix_web::Result<Worker> {
    Worker::try_from(row).map_err(|e| {
        error!(error = %e, "Unreadable worker row");
        ErrorInternalServerError("Internal Server Error")
    })
}

/// Register Worker
#[utoipa::path(
    post,
    path = "/api/workers",
    request_body = CreateWorker,
    responses(
        (status = 201, description = "Worker registered", body = Object, example = json!({
            "message": "Worker registered successfully",
            "id": 12
        })),
        (status = 400, description = "Missing required fields or malformed phone"),
        (status = 409, description = "Email, phone or document number already registered", body = Object, example = json!({
            "message": "Email already registered"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Worker",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn register_worker(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateWorker>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let email = email_filter::normalize(&payload.email);
    if email.is_empty() || payload.password.is_empty() || payload.first_name.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "first_name, email and password are required"
        })));
    }

    if !is_email_available(&email, pool.get_ref()).await {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "Email already registered"
        })));
    }

    if let Some(rejection) = check_contact(
        pool.get_ref(),
        payload.phone.as_deref(),
        payload.document_number.as_deref(),
        0,
    )
    .await?
    {
        return Ok(rejection);
    }

    let hashed = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let role = payload.role.unwrap_or(Role::Employee);
    let result = sqlx::query(
        r#"
        INSERT INTO workers
        (first_name, last_name, email, phone, document_number, position, role, status, leave_balance, hire_date, password)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(&email)
    .bind(&payload.phone)
    .bind(&payload.document_number)
    .bind(&payload.position)
    .bind(role.as_ref())
    .bind(WorkerStatus::Active.as_ref())
    .bind(config.default_leave_days)
    .bind(payload.hire_date)
    .bind(hashed)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(done) => {
            email_filter::insert(&email);
            email_cache::mark_taken(&email).await;

            let id = done.last_insert_id();
            info!(worker_id = id, admin_id = auth.worker_id, "Worker registered");

            Ok(HttpResponse::Created().json(json!({
                "message": "Worker registered successfully",
                "id": id
            })))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Ok(HttpResponse::Conflict().json(json!({
                "message": duplicate_key_message(db_err.message())
            })))
        }
        Err(e) => {
            error!(error = %e, "Failed to register worker");
            Err(ErrorInternalServerError("Internal Server Error"))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/workers",
    params(WorkerQuery),
    responses(
        (status = 200, description = "Paginated worker list", body = WorkerListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Worker",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_workers(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<WorkerQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let pagination = Pagination::new(query.page, query.per_page);
    let like = query.search.as_ref().map(|s| format!("%{}%", s.trim()));

    let mut filter = Filter::new();
    if let Some(status) = query.status.as_ref() {
        filter.push("status = ?", FilterValue::Str(status.as_ref()));
    }
    if let Some(role) = query.role.as_ref() {
        filter.push("role = ?", FilterValue::Str(role.as_ref()));
    }
    if let Some(like) = like.as_deref() {
        filter.sql.push_str(" AND (first_name LIKE ? OR last_name LIKE ? OR email LIKE ?)");
        filter.args.extend([
            FilterValue::Str(like),
            FilterValue::Str(like),
            FilterValue::Str(like),
        ]);
    }

    let count_sql = format!("SELECT COUNT(*) FROM workers{}", filter.sql);
    debug!(sql = %count_sql, "Counting workers");

    let total = filter
        .bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, sql = %count_sql, "Failed to count workers");
            ErrorInternalServerError("Database error")
        })?;

    let data_sql = format!(
        "SELECT {WORKER_COLUMNS} FROM workers{} ORDER BY id DESC LIMIT ? OFFSET ?",
        filter.sql
    );
    debug!(sql = %data_sql, page = pagination.page, per_page = pagination.per_page, "Fetching workers");

    let rows = filter
        .bind_rows(sqlx::query_as::<_, WorkerRow>(&data_sql))
        .bind(pagination.per_page)
        .bind(pagination.offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, sql = %data_sql, "Failed to fetch workers");
            ErrorInternalServerError("Database error")
        })?;

    let data = rows
        .into_iter()
        .map(read_worker)
        .collect::<actix_web::Result<Vec<_>>>()?;

    Ok(HttpResponse::Ok().json(WorkerListResponse {
        data,
        page: u32::try_from(pagination.page).unwrap_or(u32::MAX),
        per_page: u32::try_from(pagination.per_page).unwrap_or(u32::MAX),
        total,
    }))
}

/// Update Worker
#[utoipa::path(
    patch,
    path = "/api/workers/{worker_id}",
    params(
        ("worker_id", Path, description = "Worker ID")
    ),
    request_body = UpdateWorker,
    responses(
        (status = 200, description = "Worker updated successfully", body = Object, example = json!({
            "message": "Worker updated successfully"
        })),
        (status = 400, description = "Unknown or read-only field, or malformed phone"),
        (status = 404, description = "Worker not found", body = Object, example = json!({
            "message": "Worker not found"
        })),
        (status = 409, description = "Phone or document number already registered"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Worker",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_worker(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let worker_id = path.into_inner();
    apply_worker_update(pool.get_ref(), &body, UPDATABLE_COLUMNS, worker_id).await
}

/// Shared by the admin and self-service edits: whitelist, contact checks, then the UPDATE.
async fn apply_worker_update(
    pool: &MySqlPool,
    body: &Value,
    allowed: &[&str],
    worker_id: u64,
) -> actix_web::Result<HttpResponse> {
    let update = build_update_sql("workers", body, allowed, "id", worker_id)?;

    if let Some(rejection) = check_contact(
        pool,
        body.get("phone").and_then(Value::as_str),
        body.get("document_number").and_then(Value::as_str),
        worker_id,
    )
    .await?
    {
        return Ok(rejection);
    }

    let affected = match execute_update(pool, update).await {
        Ok(affected) => affected,
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            return Ok(HttpResponse::Conflict().json(json!({
                "message": duplicate_key_message(db_err.message())
            })));
        }
        Err(e) => {
            error!(error = %e, worker_id, "Failed to update worker");
            return Err(ErrorInternalServerError("Internal Server Error"));
        }
    };

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Worker not found"
        })));
    }

    info!(worker_id, "Worker updated");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Worker updated successfully"
    })))
}

/// Own Profile
#[utoipa::path(
    get,
    path = "/api/workers/me",
    responses(
        (status = 200, description = "The caller's worker record", body = Worker),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Worker not found")
    ),
    tag = "Worker",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn my_profile(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    fetch_worker(pool.get_ref(), auth.worker_id).await
}

/// Update Own Profile
///
/// Workers may change their names and phone. Everything else goes through an administrator.
#[utoipa::path(
    patch,
    path = "/api/workers/me",
    request_body = Object,
    responses(
        (status = 200, description = "Profile updated", body = Object, example = json!({
            "message": "Worker updated successfully"
        })),
        (status = 400, description = "Field not editable, or malformed phone"),
        (status = 409, description = "Phone already registered"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Worker",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_my_profile(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    apply_worker_update(pool.get_ref(), &body, SELF_UPDATABLE_COLUMNS, auth.worker_id).await
}

/// Change Own Password
///
/// Verifies the current password, stores the new hash and revokes every refresh token,
/// so other sessions must log in again.
#[utoipa::path(
    put,
    path = "/api/workers/me/password",
    request_body = ChangePassword,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "New password too short, or current password incorrect", body = Object, example = json!({
            "message": "Current password is incorrect"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Worker",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn change_password(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ChangePassword>,
) -> actix_web::Result<impl Responder> {
    if payload.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": format!("New password must have at least {MIN_PASSWORD_LEN} characters")
        })));
    }

    let worker_id = auth.worker_id;
    let stored = sqlx::query_scalar::<_, String>("SELECT password FROM workers WHERE id = ?")
        .bind(worker_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, worker_id, "Failed to load password hash");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let Some(stored) = stored else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Worker not found"
        })));
    };

    if verify_password(&payload.current_password, &stored).is_err() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Current password is incorrect"
        })));
    }

    let hashed = hash_password(&payload.new_password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, worker_id, "Failed to open transaction");
        ErrorInternalServerError("Internal Server Error")
    })?;

    sqlx::query("UPDATE workers SET password = ? WHERE id = ?")
        .bind(hashed)
        .bind(worker_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, worker_id, "Failed to store password");
            ErrorInternalServerError("Internal Server Error")
        })?;

    sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE worker_id = ?")
        .bind(worker_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, worker_id, "Failed to revoke refresh tokens");
            ErrorInternalServerError("Internal Server Error")
        })?;

    tx.commit().await.map_err(|e| {
        error!(error = %e, worker_id, "Failed to commit password change");
        ErrorInternalServerError("Internal Server Error")
    })?;

    info!(worker_id, "Password changed");

    Ok(HttpResponse::NoContent().finish())
}

/// Deactivate Worker
///
/// Inactive workers cannot log in and are skipped by the absence sweep.
/// Their refresh tokens are revoked.
#[utoipa::path(
    delete,
    path = "/api/workers/{worker_id}",
    params(
        ("worker_id", Path, description = "Worker ID")
    ),
    responses(
        (status = 200, description = "Worker deactivated", body = Object, example = json!({
            "message": "Worker deactivated"
        })),
        (status = 404, description = "Worker not found or already inactive", body = Object, example = json!({
            "message": "Worker not found or already inactive"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error", body = Object)
    ),
    tag = "Worker",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn deactivate_worker(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let worker_id = path.into_inner();

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, worker_id, "Failed to open transaction");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let result = sqlx::query("UPDATE workers SET status = ? WHERE id = ? AND status = ?")
        .bind(WorkerStatus::Inactive.as_ref())
        .bind(worker_id)
        .bind(WorkerStatus::Active.as_ref())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, worker_id, "Failed to deactivate worker");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Worker not found or already inactive"
        })));
    }

    sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE worker_id = ?")
        .bind(worker_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, worker_id, "Failed to revoke refresh tokens");
            ErrorInternalServerError("Internal Server Error")
        })?;

    tx.commit().await.map_err(|e| {
        error!(error = %e, worker_id, "Failed to commit deactivation");
        ErrorInternalServerError("Internal Server Error")
    })?;

    info!(worker_id, admin_id = auth.worker_id, "Worker deactivated");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Worker deactivated"
    })))
}

/// Get Worker by ID (admin, or the worker themself)
#[utoipa::path(
    get,
    path = "/api/workers/{worker_id}",
    params(
        ("worker_id", Path, description = "Worker ID")
    ),
    responses(
        (status = 200, description = "Worker found", body = Worker),
        (status = 404, description = "Worker not found", body = Object, example = json!({
            "message": "Worker not found"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Worker",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_worker(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let worker_id: u64 = path.into_inner();
    auth.require_self_or_admin(worker_id)?;

    fetch_worker(pool.get_ref(), worker_id).await
}

async fn fetch_worker(pool: &MySqlPool, worker_id: u64) -> actix_web::Result<HttpResponse> {
    let sql = format!("SELECT {WORKER_COLUMNS} FROM workers WHERE id = ?");
    let row = sqlx::query_as::<_, WorkerRow>(&sql)
        .bind(worker_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(error = %e, worker_id, "Failed to fetch worker");
            ErrorInternalServerError("Internal Server Error")
        })?;

    match row {
        Some(row) => Ok(HttpResponse::Ok().json(read_worker(row)?)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Worker not found"
        }))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_access_token;
    use actix_web::{App, http::StatusCode, test as actix_test};

    fn bearer(config: &Config, worker_id: u64) -> String {
        let token = generate_access_token(
            worker_id,
            format!("worker{worker_id}@company.test"),
            Role::Employee,
            &config.jwt_secret,
            60,
        )
        .unwrap();
        format!("Bearer {token}")
    }

    fn lazy_pool() -> MySqlPool {
        MySqlPool::connect_lazy("mysql://localhost/attendance_test").unwrap()
    }

    #[test]
    fn update_whitelist_guards_sensitive_columns() {
        for column in ["email", "role", "status", "leave_balance", "password"] {
            assert!(!UPDATABLE_COLUMNS.contains(&column), "{column} must not be patchable");
            assert!(!SELF_UPDATABLE_COLUMNS.contains(&column), "{column} must not be self-editable");
        }

        let body = json!({"position": "Supervisor", "leave_balance": 99});
        assert!(build_update_sql("workers", &body, UPDATABLE_COLUMNS, "id", 1).is_err());
    }

    #[test]
    fn phone_must_be_nine_digits() {
        assert!(is_valid_phone("987654321"));
        assert!(!is_valid_phone("98765432"));
        assert!(!is_valid_phone("98765432a"));
        assert!(!is_valid_phone("+51987654321"));
    }

    #[test]
    fn duplicate_key_names_the_conflicting_field() {
        assert_eq!(
            duplicate_key_message("Duplicate entry '987654321' for key 'workers.uq_workers_phone'"),
            "Phone already registered"
        );
        assert_eq!(
            duplicate_key_message(
                "Duplicate entry '70112233' for key 'workers.uq_workers_document_number'"
            ),
            "Document number already registered"
        );
        assert_eq!(
            duplicate_key_message("Duplicate entry 'a@b.c' for key 'workers.uq_workers_email'"),
            "Email already registered"
        );
    }

    #[actix_web::test]
    async fn self_edit_refuses_admin_only_fields() {
        let config = Config::for_tests();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(config.clone()))
                .route("/api/workers/me", web::patch().to(update_my_profile)),
        )
        .await;

        for body in [
            json!({"position": "Manager"}),
            json!({"document_number": "70112233"}),
            json!({"phone": "12345"}),
        ] {
            let req = actix_test::TestRequest::patch()
                .uri("/api/workers/me")
                .insert_header(("Authorization", bearer(&config, 4)))
                .set_json(&body)
                .to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{body}");
        }
    }

    #[actix_web::test]
    async fn short_new_password_is_rejected() {
        let config = Config::for_tests();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(config.clone()))
                .route("/api/workers/me/password", web::put().to(change_password)),
        )
        .await;

        let req = actix_test::TestRequest::put()
            .uri("/api/workers/me/password")
            .insert_header(("Authorization", bearer(&config, 4)))
            .set_json(json!({"current_password": "initial-pass-123", "new_password": "short"}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = actix_test::read_body_json(resp).await;
        assert!(body["message"].as_str().unwrap().contains("at least 8"));
    }

    #[actix_web::test]
    async fn password_change_requires_a_token() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(Config::for_tests()))
                .route("/api/workers/me/password", web::put().to(change_password)),
        )
        .await;

        let req = actix_test::TestRequest::put()
            .uri("/api/workers/me/password")
            .set_json(json!({"current_password": "a", "new_password": "long-enough-1"}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
