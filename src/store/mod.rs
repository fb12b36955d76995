use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{
    attendance::AttendanceRecord,
    justification::{Justification, NewJustification},
    leave_request::{LeaveRequest, NewLeaveRequest},
    worker::Worker,
};

pub mod mysql;

#[cfg(test)]
pub mod memory;

pub use mysql::MySqlStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid row: {0}")]
    InvalidRow(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence used by the attendance, sweep and review workflows.
///
/// Methods returning `bool` are conditional writes: `false` means the
/// precondition no longer held when the write reached storage (another
/// request or the sweeper got there first), and nothing was changed.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_worker(&self, worker_id: u64) -> StoreResult<Option<Worker>>;

    async fn list_active_workers(&self) -> StoreResult<Vec<Worker>>;

    async fn find_attendance(&self, attendance_id: u64) -> StoreResult<Option<AttendanceRecord>>;

    async fn find_attendance_for_day(
        &self,
        worker_id: u64,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>>;

    /// Inserts unless `(worker_id, date)` already has a row. Returns the new id.
    async fn insert_attendance_if_absent(
        &self,
        record: &AttendanceRecord,
    ) -> StoreResult<Option<u64>>;

    /// Fills check-in fields on a row that has none and is not `Absent`.
    async fn record_check_in(&self, record: &AttendanceRecord) -> StoreResult<bool>;

    /// Fills check-out fields on a row that has none.
    async fn record_check_out(&self, record: &AttendanceRecord) -> StoreResult<bool>;

    async fn find_pending_leave(&self, worker_id: u64) -> StoreResult<Option<LeaveRequest>>;

    async fn find_leave(&self, leave_id: u64) -> StoreResult<Option<LeaveRequest>>;

    async fn insert_leave(&self, leave: &NewLeaveRequest) -> StoreResult<u64>;

    /// Approves a pending request and deducts `days` from the worker's
    /// balance in one step; fails if either condition no longer holds.
    async fn approve_leave(
        &self,
        leave_id: u64,
        worker_id: u64,
        days: i32,
        decided_on: NaiveDate,
        motive: &str,
    ) -> StoreResult<bool>;

    async fn reject_leave(
        &self,
        leave_id: u64,
        decided_on: NaiveDate,
        motive: &str,
    ) -> StoreResult<bool>;

    async fn find_pending_justification(
        &self,
        worker_id: u64,
    ) -> StoreResult<Option<Justification>>;

    async fn find_justification(&self, justification_id: u64)
    -> StoreResult<Option<Justification>>;

    async fn insert_justification(&self, justification: &NewJustification) -> StoreResult<u64>;

    /// Approves a pending justification and marks its attendance row justified.
    async fn approve_justification(
        &self,
        justification_id: u64,
        attendance_id: u64,
        decided_on: NaiveDate,
        motive: &str,
    ) -> StoreResult<bool>;

    async fn reject_justification(
        &self,
        justification_id: u64,
        decided_on: NaiveDate,
        motive: &str,
    ) -> StoreResult<bool>;
}
