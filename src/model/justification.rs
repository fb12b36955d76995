use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::leave_request::RequestStatus;
use crate::store::StoreError;

/// After-the-fact excuse for an absence or late arrival.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Justification {
    pub id: u64,
    pub worker_id: u64,
    pub attendance_id: u64,
    #[schema(example = "2026-03-03", value_type = String, format = "date")]
    pub submitted_on: NaiveDate,
    pub description: String,
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

#[derive(Debug, Clone)]
pub struct NewJustification {
    pub worker_id: u64,
    pub attendance_id: u64,
    pub submitted_on: NaiveDate,
    pub description: String,
    pub evidence: Option<Vec<u8>>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct JustificationRow {
    pub id: u64,
    pub worker_id: u64,
    pub attendance_id: u64,
    pub submitted_on: NaiveDate,
    pub description: String,
    pub evidence: Option<Vec<u8>>,
    pub status: String,
    pub approved_on: Option<NaiveDate>,
    pub rejected_on: Option<NaiveDate>,
    pub motive: Option<String>,
}

impl TryFrom<JustificationRow> for Justification {
    type Error = StoreError;

    fn try_from(row: JustificationRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|_| {
            StoreError::InvalidRow(format!("justification {}: status '{}'", row.id, row.status))
        })?;

        Ok(Justification {
            id: row.id,
            worker_id: row.worker_id,
            attendance_id: row.attendance_id,
            submitted_on: row.submitted_on,
            description: row.description,
            evidence: row.evidence,
            status,
            approved_on: row.approved_on,
            rejected_on: row.rejected_on,
            motive: row.motive,
        })
    }
}

pub const JUSTIFICATION_COLUMNS: &str = "id, worker_id, attendance_id, submitted_on, description, \
     evidence, status, approved_on, rejected_on, motive";
