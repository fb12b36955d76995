use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::store::StoreError;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    CheckedOut,
    Justified,
}

impl AttendanceStatus {
    /// Statuses a worker may submit a justification for.
    pub fn is_justifiable(self) -> bool {
        matches!(self, AttendanceStatus::Absent | AttendanceStatus::Late)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    #[schema(example = -5.224747)]
    pub latitude: f64,
    #[schema(example = -80.630393)]
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn map_link(&self) -> String {
        format!(
            "https://www.google.com/maps?q={},{}",
            self.latitude, self.longitude
        )
    }
}

/// One worker's entry for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 7)]
    pub worker_id: u64,
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "08:12:40", value_type = Option<String>)]
    pub check_in: Option<NaiveTime>,
    pub check_in_at: Option<Coordinates>,
    #[schema(example = "17:02:10", value_type = Option<String>)]
    pub check_out: Option<NaiveTime>,
    pub check_out_at: Option<Coordinates>,
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    /// Record written by the absence sweep: no times, no coordinates.
    pub fn absent(worker_id: u64, date: NaiveDate) -> Self {
        Self {
            id: 0,
            worker_id,
            date,
            check_in: None,
            check_in_at: None,
            check_out: None,
            check_out_at: None,
            status: AttendanceStatus::Absent,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceRow {
    pub id: u64,
    pub worker_id: u64,
    pub date: NaiveDate,
    pub check_in: Option<NaiveTime>,
    pub check_in_lat: Option<f64>,
    pub check_in_lon: Option<f64>,
    pub check_out: Option<NaiveTime>,
    pub check_out_lat: Option<f64>,
    pub check_out_lon: Option<f64>,
    pub status: String,
}

fn coordinates(lat: Option<f64>, lon: Option<f64>) -> Option<Coordinates> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
        _ => None,
    }
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|_| {
            StoreError::InvalidRow(format!("attendance {}: status '{}'", row.id, row.status))
        })?;

        Ok(AttendanceRecord {
            id: row.id,
            worker_id: row.worker_id,
            date: row.date,
            check_in: row.check_in,
            check_in_at: coordinates(row.check_in_lat, row.check_in_lon),
            check_out: row.check_out,
            check_out_at: coordinates(row.check_out_lat, row.check_out_lon),
            status,
        })
    }
}

pub const ATTENDANCE_COLUMNS: &str = "id, worker_id, date, check_in, check_in_lat, check_in_lon, \
     check_out, check_out_lat, check_out_lon, status";

/// Classification used by the attendance report.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportMark {
    Attended,
    Late,
    Justified,
    Absent,
}

impl ReportMark {
    /// A day only counts as worked when both check-in and check-out exist.
    pub fn for_record(record: &AttendanceRecord) -> Self {
        if record.check_in.is_none() || record.check_out.is_none() {
            return match record.status {
                AttendanceStatus::Justified => ReportMark::Justified,
                _ => ReportMark::Absent,
            };
        }

        match record.status {
            AttendanceStatus::Late => ReportMark::Late,
            AttendanceStatus::Justified => ReportMark::Justified,
            _ => ReportMark::Attended,
        }
    }
}
