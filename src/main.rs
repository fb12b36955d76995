use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use dotenvy::dotenv;
use std::sync::Arc;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod routes;
mod service;
mod store;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::routes::Limits;
use crate::service::{AbsenceSweeper, AttendanceService, JustificationService, LeaveService};
use crate::store::{MySqlStore, Store};
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::{email_cache, email_filter};
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await?;
    let limits = Limits::from_config(&config)?;

    let store: Arc<dyn Store> = Arc::new(MySqlStore::new(pool.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(config.utc_offset));

    let attendance = Data::new(AttendanceService::new(
        store.clone(),
        clock.clone(),
        config.site_policy(),
    ));
    let leave = Data::new(LeaveService::new(store.clone(), clock.clone()));
    let justification = Data::new(JustificationService::new(store.clone(), clock.clone()));

    let sweeper = Arc::new(AbsenceSweeper::new(store, clock, config.absence_sweep_at));
    let sweeper_data = Data::from(sweeper.clone());

    let pool_for_filter_warmup = pool.clone();
    let pool_for_cache_warmup = pool.clone();

    actix_web::rt::spawn(async move {
        if let Err(e) = email_filter::warmup_email_filter(&pool_for_filter_warmup, 100).await {
            error!(error = ?e, "Failed to warm up email filter");
        }
    });

    actix_web::rt::spawn(async move {
        // recent logins over the last 30 days, in batches of 250
        if let Err(e) = email_cache::warmup_email_cache(&pool_for_cache_warmup, 30, 250).await {
            error!(error = ?e, "Failed to warm up email cache");
        }
    });

    let sweeper_handle = sweeper.start(config.sweep_interval);

    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config.clone());
    let pool_data = Data::new(pool);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard serves the JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(pool_data.clone())
            .app_data(config_data.clone())
            .app_data(attendance.clone())
            .app_data(leave.clone())
            .app_data(justification.clone())
            .app_data(sweeper_data.clone())
            .configure(|cfg| routes::configure(cfg, &config, &limits))
    })
    .bind(server_addr)?
    .run()
    .await?;

    sweeper_handle.stop();
    info!("Server stopped");

    Ok(())
}
