use crate::{
    api::{attendance, justification, leave_request, worker},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::Context;

type LimiterConfig = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-route rate limits, built once so every worker thread shares the same buckets.
#[derive(Clone)]
pub struct Limits {
    login: LimiterConfig,
    refresh: LimiterConfig,
    protected: LimiterConfig,
}

fn build_limiter(requests_per_min: u32) -> anyhow::Result<LimiterConfig> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .context("invalid rate limit")
}

impl Limits {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            login: build_limiter(config.rate_login_per_min)?,
            refresh: build_limiter(config.rate_refresh_per_min)?,
            protected: build_limiter(config.rate_protected_per_min)?,
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limits: &Limits) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(Governor::new(&limits.login))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(Governor::new(&limits.refresh))
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(Governor::new(&limits.login))
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes; static segments are registered before `{id}`
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(Governor::new(&limits.protected))
            .service(web::resource("/time").route(web::get().to(attendance::server_time)))
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(web::resource("").route(web::get().to(attendance::attendance_list)))
                    .service(
                        web::resource("/check-in").route(web::post().to(attendance::check_in)),
                    )
                    .service(
                        web::resource("/check-out").route(web::post().to(attendance::check_out)),
                    )
                    .service(web::resource("/today").route(web::get().to(attendance::today)))
                    .service(web::resource("/me").route(web::get().to(attendance::my_attendance)))
                    .service(
                        web::resource("/report").route(web::get().to(attendance::attendance_report)),
                    )
                    .service(web::resource("/sweep").route(web::post().to(attendance::run_sweep))),
            )
            .service(
                web::scope("/workers")
                    // /workers
                    .service(
                        web::resource("")
                            .route(web::post().to(worker::register_worker))
                            .route(web::get().to(worker::list_workers)),
                    )
                    .service(
                        web::resource("/me")
                            .route(web::get().to(worker::my_profile))
                            .route(web::patch().to(worker::update_my_profile)),
                    )
                    .service(
                        web::resource("/me/password").route(web::put().to(worker::change_password)),
                    )
                    // /workers/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(worker::get_worker))
                            .route(web::patch().to(worker::update_worker))
                            .route(web::delete().to(worker::deactivate_worker)),
                    ),
            )
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    .service(web::resource("/me").route(web::get().to(leave_request::my_leaves)))
                    .service(
                        web::resource("/pending/{worker_id}")
                            .route(web::get().to(leave_request::pending_leave)),
                    )
                    // /leave/{id}
                    .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave)),
                    ),
            )
            .service(
                web::scope("/justifications")
                    // /justifications
                    .service(
                        web::resource("")
                            .route(web::get().to(justification::justification_list))
                            .route(web::post().to(justification::create_justification)),
                    )
                    .service(
                        web::resource("/justifiable")
                            .route(web::get().to(justification::justifiable_records)),
                    )
                    .service(
                        web::resource("/pending/{worker_id}")
                            .route(web::get().to(justification::pending_justification)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(justification::approve_justification)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(justification::reject_justification)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (ACCESS_TOKEN_TTL)
//  └─ refresh_token (REFRESH_TOKEN_TTL), rotated on every /auth/refresh

// API REQUEST
//  └─ Authorization: Bearer access_token
