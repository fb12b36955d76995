use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::store::StoreError;

/// Review state shared by leave requests and justifications.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 3)]
    pub id: u64,
    #[schema(example = 7)]
    pub worker_id: u64,
    #[schema(example = "2026-03-01", value_type = String, format = "date")]
    pub requested_on: NaiveDate,
    #[schema(example = "2026-03-02", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(example = "2026-03-06", value_type = String, format = "date")]
    pub end_date: NaiveDate,
    #[schema(example = "medical")]
    pub leave_type: String,
    pub description: String,
    /// Base64-encoded attachment
    #[serde(serialize_with = "crate::model::evidence::serialize")]
    #[schema(value_type = Option<String>, format = "byte")]
    pub evidence: Option<Vec<u8>>,
    pub status: RequestStatus,
    #[schema(value_type = Option<String>, format = "date")]
    pub approved_on: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = "date")]
    pub rejected_on: Option<NaiveDate>,
    pub motive: Option<String>,
}

impl LeaveRequest {
    /// Number of leave days consumed, counting both ends.
    pub fn day_span(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub worker_id: u64,
    pub requested_on: NaiveDate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub leave_type: String,
    pub description: String,
    pub evidence: Option<Vec<u8>>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct LeaveRow {
    pub id: u64,
    pub worker_id: u64,
    pub requested_on: NaiveDate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub leave_type: String,
    pub description: String,
    pub evidence: Option<Vec<u8>>,
    pub status: String,
    pub approved_on: Option<NaiveDate>,
    pub rejected_on: Option<NaiveDate>,
    pub motive: Option<String>,
}

impl TryFrom<LeaveRow> for LeaveRequest {
    type Error = StoreError;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|_| {
            StoreError::InvalidRow(format!("leave request {}: status '{}'", row.id, row.status))
        })?;

        Ok(LeaveRequest {
            id: row.id,
            worker_id: row.worker_id,
            requested_on: row.requested_on,
            start_date: row.start_date,
            end_date: row.end_date,
            leave_type: row.leave_type,
            description: row.description,
            evidence: row.evidence,
            status,
            approved_on: row.approved_on,
            rejected_on: row.rejected_on,
            motive: row.motive,
        })
    }
}

pub const LEAVE_COLUMNS: &str = "id, worker_id, requested_on, start_date, end_date, leave_type, \
     description, evidence, status, approved_on, rejected_on, motive";
