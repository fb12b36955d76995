use std::{env, str::FromStr, time::Duration};

use anyhow::{Context, bail};
use chrono::{FixedOffset, NaiveTime};

use crate::model::attendance::Coordinates;
use crate::service::SitePolicy;
use crate::utils::geo::GeoFence;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Site
    pub site_latitude: f64,
    pub site_longitude: f64,
    pub site_radius_meters: f64,
    pub late_after: NaiveTime,

    // Absence sweep
    pub absence_sweep_at: NaiveTime,
    pub sweep_interval: Duration,

    /// Offset of the site's wall clock. `None` uses the host's local zone.
    pub utc_offset: Option<FixedOffset>,
    pub default_leave_days: i32,
}

fn var_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key}: invalid value '{raw}': {e}")),
        Err(_) => Ok(default),
    }
}

fn time_or(key: &str, default: NaiveTime) -> anyhow::Result<NaiveTime> {
    match env::var(key) {
        Ok(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(raw.trim(), "%H:%M"))
            .with_context(|| format!("{key}: expected HH:MM[:SS], got '{raw}'")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let sweep_interval_secs: u64 = var_or("SWEEP_INTERVAL_SECS", 30)?;
        if sweep_interval_secs == 0 || sweep_interval_secs > 60 {
            // a coarser tick could step over a whole cutoff minute
            bail!("SWEEP_INTERVAL_SECS must be between 1 and 60");
        }

        let utc_offset = match env::var("UTC_OFFSET_MINUTES") {
            Ok(raw) => {
                let minutes: i32 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("UTC_OFFSET_MINUTES: invalid value '{raw}'"))?;
                Some(
                    FixedOffset::east_opt(minutes * 60)
                        .context("UTC_OFFSET_MINUTES out of range")?,
                )
            }
            Err(_) => None,
        };

        let site_radius_meters = var_or("SITE_RADIUS_METERS", 100.0)?;
        if site_radius_meters <= 0.0 {
            bail!("SITE_RADIUS_METERS must be positive");
        }

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").context("SERVER_ADDR must be set")?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            access_token_ttl: var_or("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: var_or("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: var_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: var_or("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            site_latitude: var_or("SITE_LATITUDE", -5.224747)?,
            site_longitude: var_or("SITE_LONGITUDE", -80.630393)?,
            site_radius_meters,
            late_after: time_or("LATE_AFTER", NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default())?,

            absence_sweep_at: time_or(
                "ABSENCE_SWEEP_AT",
                NaiveTime::from_hms_opt(23, 0, 0).unwrap_or_default(),
            )?,
            sweep_interval: Duration::from_secs(sweep_interval_secs),

            utc_offset,
            default_leave_days: var_or("DEFAULT_LEAVE_DAYS", 15)?,
        })
    }

    pub fn site_policy(&self) -> SitePolicy {
        SitePolicy {
            fence: GeoFence::new(
                Coordinates::new(self.site_latitude, self.site_longitude),
                self.site_radius_meters,
            ),
            late_after: self.late_after,
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://localhost/attendance_test".into(),
            jwt_secret: "test-secret".into(),
            server_addr: "127.0.0.1:0".into(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            rate_login_per_min: 60,
            rate_refresh_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".into(),
            site_latitude: -5.224747,
            site_longitude: -80.630393,
            site_radius_meters: 100.0,
            late_after: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            absence_sweep_at: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            sweep_interval: Duration::from_secs(30),
            utc_offset: FixedOffset::west_opt(5 * 3600),
            default_leave_days: 15,
        }
    }
}
