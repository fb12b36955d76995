//! In-memory `Store` for unit tests. Enforces the same uniqueness and
//! conditional-write rules as the MySQL schema.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus},
    justification::{Justification, NewJustification},
    leave_request::{LeaveRequest, NewLeaveRequest, RequestStatus},
    worker::{Worker, WorkerStatus},
};
use crate::store::{Store, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    workers: Vec<Worker>,
    attendance: Vec<AttendanceRecord>,
    leaves: Vec<LeaveRequest>,
    justifications: Vec<Justification>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing_workers: Mutex<HashSet<u64>>,
    concurrent_write: Mutex<Option<AttendanceRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_worker(&self, worker: Worker) {
        self.tables.lock().unwrap().workers.push(worker);
    }

    pub fn add_attendance(&self, mut record: AttendanceRecord) -> u64 {
        let mut tables = self.tables.lock().unwrap();
        record.id = tables.attendance.len() as u64 + 1;
        let id = record.id;
        tables.attendance.push(record);
        id
    }

    /// Attendance inserts for this worker time out.
    pub fn fail_writes_for(&self, worker_id: u64) {
        self.failing_workers.lock().unwrap().insert(worker_id);
    }

    /// Lands `record` right after the next attendance lookup has been answered,
    /// as a concurrent writer would. A record whose id exists replaces that row.
    pub fn write_after_next_read(&self, record: AttendanceRecord) {
        *self.concurrent_write.lock().unwrap() = Some(record);
    }

    pub fn worker(&self, worker_id: u64) -> Option<Worker> {
        let tables = self.tables.lock().unwrap();
        tables.workers.iter().find(|w| w.id == worker_id).cloned()
    }

    pub fn attendance(&self) -> Vec<AttendanceRecord> {
        self.tables.lock().unwrap().attendance.clone()
    }

    pub fn leave(&self, leave_id: u64) -> Option<LeaveRequest> {
        let tables = self.tables.lock().unwrap();
        tables.leaves.iter().find(|l| l.id == leave_id).cloned()
    }

    pub fn justification(&self, justification_id: u64) -> Option<Justification> {
        let tables = self.tables.lock().unwrap();
        tables
            .justifications
            .iter()
            .find(|j| j.id == justification_id)
            .cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_worker(&self, worker_id: u64) -> StoreResult<Option<Worker>> {
        Ok(self.worker(worker_id))
    }

    async fn list_active_workers(&self) -> StoreResult<Vec<Worker>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .workers
            .iter()
            .filter(|w| w.status == WorkerStatus::Active)
            .cloned()
            .collect())
    }

    async fn find_attendance(&self, attendance_id: u64) -> StoreResult<Option<AttendanceRecord>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .attendance
            .iter()
            .find(|a| a.id == attendance_id)
            .cloned())
    }

    async fn find_attendance_for_day(
        &self,
        worker_id: u64,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let mut tables = self.tables.lock().unwrap();
        let found = tables
            .attendance
            .iter()
            .find(|a| a.worker_id == worker_id && a.date == date)
            .cloned();

        if let Some(mut write) = self.concurrent_write.lock().unwrap().take() {
            match tables.attendance.iter_mut().find(|a| a.id == write.id) {
                Some(row) => *row = write,
                None => {
                    write.id = tables.attendance.len() as u64 + 1;
                    tables.attendance.push(write);
                }
            }
        }

        Ok(found)
    }

    async fn insert_attendance_if_absent(
        &self,
        record: &AttendanceRecord,
    ) -> StoreResult<Option<u64>> {
        if self
            .failing_workers
            .lock()
            .unwrap()
            .contains(&record.worker_id)
        {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut tables = self.tables.lock().unwrap();
        if tables
            .attendance
            .iter()
            .any(|a| a.worker_id == record.worker_id && a.date == record.date)
        {
            return Ok(None);
        }

        let id = tables.attendance.len() as u64 + 1;
        tables.attendance.push(AttendanceRecord {
            id,
            ..record.clone()
        });
        Ok(Some(id))
    }

    async fn record_check_in(&self, record: &AttendanceRecord) -> StoreResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        match tables.attendance.iter_mut().find(|a| {
            a.id == record.id && a.check_in.is_none() && a.status != AttendanceStatus::Absent
        }) {
            Some(row) => {
                row.check_in = record.check_in;
                row.check_in_at = record.check_in_at;
                row.status = record.status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_check_out(&self, record: &AttendanceRecord) -> StoreResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        match tables.attendance.iter_mut().find(|a| {
            a.id == record.id && a.check_out.is_none() && a.status != AttendanceStatus::Absent
        }) {
            Some(row) => {
                row.check_out = record.check_out;
                row.check_out_at = record.check_out_at;
                row.status = record.status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_pending_leave(&self, worker_id: u64) -> StoreResult<Option<LeaveRequest>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .leaves
            .iter()
            .find(|l| l.worker_id == worker_id && l.status == RequestStatus::Pending)
            .cloned())
    }

    async fn find_leave(&self, leave_id: u64) -> StoreResult<Option<LeaveRequest>> {
        Ok(self.leave(leave_id))
    }

    async fn insert_leave(&self, leave: &NewLeaveRequest) -> StoreResult<u64> {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.leaves.len() as u64 + 1;
        tables.leaves.push(LeaveRequest {
            id,
            worker_id: leave.worker_id,
            requested_on: leave.requested_on,
            start_date: leave.start_date,
            end_date: leave.end_date,
            leave_type: leave.leave_type.clone(),
            description: leave.description.clone(),
            evidence: leave.evidence.clone(),
            status: RequestStatus::Pending,
            approved_on: None,
            rejected_on: None,
            motive: None,
        });
        Ok(id)
    }

    async fn approve_leave(
        &self,
        leave_id: u64,
        worker_id: u64,
        days: i32,
        decided_on: NaiveDate,
        motive: &str,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.lock().unwrap();

        let balance_ok = tables
            .workers
            .iter()
            .any(|w| w.id == worker_id && w.leave_balance >= days);
        let pending = tables
            .leaves
            .iter()
            .any(|l| l.id == leave_id && l.status == RequestStatus::Pending);
        if !balance_ok || !pending {
            return Ok(false);
        }

        if let Some(worker) = tables.workers.iter_mut().find(|w| w.id == worker_id) {
            worker.leave_balance -= days;
        }
        if let Some(leave) = tables.leaves.iter_mut().find(|l| l.id == leave_id) {
            leave.status = RequestStatus::Approved;
            leave.approved_on = Some(decided_on);
            leave.motive = Some(motive.to_string());
        }
        Ok(true)
    }

    async fn reject_leave(
        &self,
        leave_id: u64,
        decided_on: NaiveDate,
        motive: &str,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        match tables
            .leaves
            .iter_mut()
            .find(|l| l.id == leave_id && l.status == RequestStatus::Pending)
        {
            Some(leave) => {
                leave.status = RequestStatus::Rejected;
                leave.rejected_on = Some(decided_on);
                leave.motive = Some(motive.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_pending_justification(
        &self,
        worker_id: u64,
    ) -> StoreResult<Option<Justification>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .justifications
            .iter()
            .find(|j| j.worker_id == worker_id && j.status == RequestStatus::Pending)
            .cloned())
    }

    async fn find_justification(
        &self,
        justification_id: u64,
    ) -> StoreResult<Option<Justification>> {
        Ok(self.justification(justification_id))
    }

    async fn insert_justification(&self, justification: &NewJustification) -> StoreResult<u64> {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.justifications.len() as u64 + 1;
        tables.justifications.push(Justification {
            id,
            worker_id: justification.worker_id,
            attendance_id: justification.attendance_id,
            submitted_on: justification.submitted_on,
            description: justification.description.clone(),
            evidence: justification.evidence.clone(),
            status: RequestStatus::Pending,
            approved_on: None,
            rejected_on: None,
            motive: None,
        });
        Ok(id)
    }

    async fn approve_justification(
        &self,
        justification_id: u64,
        attendance_id: u64,
        decided_on: NaiveDate,
        motive: &str,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        match tables
            .justifications
            .iter_mut()
            .find(|j| j.id == justification_id && j.status == RequestStatus::Pending)
        {
            Some(justification) => {
                justification.status = RequestStatus::Approved;
                justification.approved_on = Some(decided_on);
                justification.motive = Some(motive.to_string());
            }
            None => return Ok(false),
        }

        if let Some(record) = tables.attendance.iter_mut().find(|a| a.id == attendance_id) {
            record.status = AttendanceStatus::Justified;
        }
        Ok(true)
    }

    async fn reject_justification(
        &self,
        justification_id: u64,
        decided_on: NaiveDate,
        motive: &str,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        match tables
            .justifications
            .iter_mut()
            .find(|j| j.id == justification_id && j.status == RequestStatus::Pending)
        {
            Some(justification) => {
                justification.status = RequestStatus::Rejected;
                justification.rejected_on = Some(decided_on);
                justification.motive = Some(motive.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

pub mod fixtures {
    use chrono::NaiveDate;

    use crate::model::{
        role::Role,
        worker::{Worker, WorkerStatus},
    };

    pub fn worker(id: u64) -> Worker {
        Worker {
            id,
            first_name: format!("Worker{id}"),
            last_name: "Test".to_string(),
            email: format!("worker{id}@company.test"),
            phone: None,
            document_number: None,
            position: "Clerk".to_string(),
            role: Role::Employee,
            status: WorkerStatus::Active,
            leave_balance: 15,
            hire_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }
}
