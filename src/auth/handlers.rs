use crate::{
    auth::{
        jwt::{TokenType, generate_access_token, generate_refresh_token, verify_token},
        password::verify_password,
    },
    config::Config,
    model::{role::Role, worker::WorkerStatus},
    utils::{email_cache, email_filter},
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, MySqlPool};
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "ana.quispe@company.com", format = "email")]
    pub email: String,
    #[schema(example = "initial-pass-123", format = "password")]
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(FromRow)]
struct Credentials {
    id: u64,
    email: String,
    password: String,
    role: String,
    status: String,
}

fn internal_error() -> HttpResponse {
    HttpResponse::InternalServerError().json(json!({
        "message": "Internal Server Error"
    }))
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Signs an access/refresh pair and records the refresh token id.
async fn issue_tokens(
    pool: &MySqlPool,
    config: &Config,
    worker_id: u64,
    email: &str,
    role: Role,
) -> Result<LoginResponse, HttpResponse> {
    let access_token = generate_access_token(
        worker_id,
        email.to_string(),
        role,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, worker_id, "Failed to sign access token");
        internal_error()
    })?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        worker_id,
        email.to_string(),
        role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, worker_id, "Failed to sign refresh token");
        internal_error()
    })?;

    debug!(worker_id, jti = %refresh_claims.jti, "Storing refresh token");

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (worker_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(worker_id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool)
    .await
    .map_err(|e| {
        error!(error = %e, worker_id, "Failed to store refresh token");
        internal_error()
    })?;

    Ok(LoginResponse {
        access_token,
        refresh_token,
    })
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair issued", body = LoginResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials", body = Object, example = json!({
            "message": "Invalid credentials"
        })),
        (status = 403, description = "Worker is inactive"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(email = %user.email)
)]
pub async fn login(
    user: web::Json<LoginRequest>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    let email = email_filter::normalize(&user.email);
    if email.is_empty() || user.password.is_empty() {
        info!("Validation failed: empty email or password");
        return HttpResponse::BadRequest().json(json!({
            "message": "Email and password are required"
        }));
    }

    let unauthorized = || {
        HttpResponse::Unauthorized().json(json!({
            "message": "Invalid credentials"
        }))
    };

    let worker = match sqlx::query_as::<_, Credentials>(
        r#"
        SELECT id, email, password, role, status
        FROM workers
        WHERE email = ?
        "#,
    )
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(worker)) => {
            debug!(worker_id = worker.id, "Worker found");
            worker
        }
        Ok(None) => {
            info!("Invalid credentials: unknown email");
            return unauthorized();
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching worker");
            return internal_error();
        }
    };

    if let Err(e) = verify_password(&user.password, &worker.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return unauthorized();
    }

    if worker.status != WorkerStatus::Active.as_ref() {
        info!(worker_id = worker.id, "Login refused: worker inactive");
        return HttpResponse::Forbidden().json(json!({
            "message": "Worker is inactive"
        }));
    }

    let role: Role = match worker.role.parse() {
        Ok(role) => role,
        Err(_) => {
            error!(worker_id = worker.id, role = %worker.role, "Unknown role on worker");
            return internal_error();
        }
    };

    let tokens = match issue_tokens(pool.get_ref(), &config, worker.id, &worker.email, role).await {
        Ok(tokens) => tokens,
        Err(resp) => return resp,
    };

    // non-fatal
    if let Err(e) = sqlx::query("UPDATE workers SET last_login_at = NOW() WHERE id = ?")
        .bind(worker.id)
        .execute(pool.get_ref())
        .await
    {
        warn!(error = %e, "Failed to update last_login_at");
    }

    email_cache::mark_taken(&worker.email).await;

    info!(worker_id = worker.id, "Login successful");

    HttpResponse::Ok().json(tokens)
}

#[derive(FromRow)]
struct RefreshRecord {
    id: u64,
    revoked: bool,
    role: String,
    status: String,
}

/// Rotate a refresh token
///
/// The presented refresh token is revoked and a fresh pair is issued.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = LoginResponse),
        (status = 401, description = "Missing, invalid or revoked refresh token")
    ),
    tag = "Auth",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(token) = bearer(&req) else {
        return HttpResponse::Unauthorized().json(json!({ "message": "No token" }));
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::Unauthorized().finish(),
    };

    let record = sqlx::query_as::<_, RefreshRecord>(
        r#"
        SELECT rt.id, rt.revoked, w.role, w.status
        FROM refresh_tokens rt
        JOIN workers w ON w.id = rt.worker_id
        WHERE rt.jti = ?
        "#,
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await;

    let record = match record {
        Ok(Some(r)) if !r.revoked && r.status == WorkerStatus::Active.as_ref() => r,
        Ok(_) => return HttpResponse::Unauthorized().finish(),
        Err(e) => {
            error!(error = %e, "Failed to look up refresh token");
            return internal_error();
        }
    };

    // Rotation: only the caller that flips `revoked` gets a new pair
    let revoked = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE id = ? AND revoked = 0")
        .bind(record.id)
        .execute(pool.get_ref())
        .await;

    match revoked {
        Ok(done) if done.rows_affected() == 1 => {}
        Ok(_) => return HttpResponse::Unauthorized().finish(),
        Err(e) => {
            error!(error = %e, "Failed to revoke refresh token");
            return internal_error();
        }
    }

    // role may have changed since the token was issued
    let role: Role = match record.role.parse() {
        Ok(role) => role,
        Err(_) => {
            error!(worker_id = claims.worker_id, role = %record.role, "Unknown role on worker");
            return internal_error();
        }
    };

    match issue_tokens(pool.get_ref(), &config, claims.worker_id, &claims.sub, role).await {
        Ok(tokens) => HttpResponse::Ok().json(tokens),
        Err(resp) => resp,
    }
}

/// Log out by revoking the presented refresh token. Always 204.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Logged out")
    ),
    tag = "Auth",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let claims = match bearer(&req).map(|t| verify_token(t, &config.jwt_secret)) {
        Some(Ok(c)) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    // idempotent
    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        warn!(error = %e, worker_id = claims.worker_id, "Failed to revoke refresh token");
    }

    HttpResponse::NoContent().finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test};

    #[actix_web::test]
    async fn logout_without_token_is_no_content() {
        let pool = MySqlPool::connect_lazy("mysql://localhost/attendance_test").unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(Config::for_tests()))
                .route("/auth/logout", web::post().to(logout)),
        )
        .await;

        let req = test::TestRequest::post().uri("/auth/logout").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn refresh_rejects_access_tokens() {
        let config = Config::for_tests();
        let access = generate_access_token(
            3,
            "ana@company.com".into(),
            Role::Employee,
            &config.jwt_secret,
            60,
        )
        .unwrap();

        let pool = MySqlPool::connect_lazy("mysql://localhost/attendance_test").unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(config))
                .route("/auth/refresh", web::post().to(refresh_token)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/refresh")
            .insert_header(("Authorization", format!("Bearer {access}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
