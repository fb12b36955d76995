use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::role::Role;
use crate::store::StoreError;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkerStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "first_name": "Ana",
        "last_name": "Quispe",
        "email": "ana.quispe@company.com",
        "phone": "987654321",
        "document_number": "70112233",
        "position": "Warehouse clerk",
        "role": "employee",
        "status": "active",
        "leave_balance": 15,
        "hire_date": "2024-01-01"
    })
)]
pub struct Worker {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Ana")]
    pub first_name: String,

    #[schema(example = "Quispe")]
    pub last_name: String,

    #[schema(example = "ana.quispe@company.com")]
    pub email: String,

    #[schema(example = "987654321", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = "70112233", nullable = true)]
    pub document_number: Option<String>,

    #[schema(example = "Warehouse clerk")]
    pub position: String,

    pub role: Role,

    pub status: WorkerStatus,

    /// Remaining leave days
    #[schema(example = 15)]
    pub leave_balance: i32,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub hire_date: NaiveDate,
}

/// Raw `workers` row; enum columns are stored as text.
#[derive(Debug, sqlx::FromRow)]
pub struct WorkerRow {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub document_number: Option<String>,
    pub position: String,
    pub role: String,
    pub status: String,
    pub leave_balance: i32,
    pub hire_date: NaiveDate,
}

impl TryFrom<WorkerRow> for Worker {
    type Error = StoreError;

    fn try_from(row: WorkerRow) -> Result<Self, Self::Error> {
        Ok(Worker {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            document_number: row.document_number,
            position: row.position,
            role: row
                .role
                .parse()
                .map_err(|_| StoreError::InvalidRow(format!("worker {}: role '{}'", row.id, row.role)))?,
            status: row.status.parse().map_err(|_| {
                StoreError::InvalidRow(format!("worker {}: status '{}'", row.id, row.status))
            })?,
            leave_balance: row.leave_balance,
            hire_date: row.hire_date,
        })
    }
}

pub const WORKER_COLUMNS: &str = "id, first_name, last_name, email, phone, document_number, \
     position, role, status, leave_balance, hire_date";
