use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::MySqlPool;

use crate::model::{
    attendance::{ATTENDANCE_COLUMNS, AttendanceRecord, AttendanceRow, AttendanceStatus},
    justification::{JUSTIFICATION_COLUMNS, Justification, JustificationRow, NewJustification},
    leave_request::{LEAVE_COLUMNS, LeaveRequest, LeaveRow, NewLeaveRequest, RequestStatus},
    worker::{WORKER_COLUMNS, Worker, WorkerRow, WorkerStatus},
};
use crate::store::{Store, StoreError, StoreResult};

/// `Store` backed by the MySQL schema in `migrations/`.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[async_trait]
impl Store for MySqlStore {
    async fn find_worker(&self, worker_id: u64) -> StoreResult<Option<Worker>> {
        let sql = format!("SELECT {WORKER_COLUMNS} FROM workers WHERE id = ?");
        sqlx::query_as::<_, WorkerRow>(&sql)
            .bind(worker_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Worker::try_from)
            .transpose()
    }

    async fn list_active_workers(&self) -> StoreResult<Vec<Worker>> {
        let sql = format!("SELECT {WORKER_COLUMNS} FROM workers WHERE status = ? ORDER BY id");
        sqlx::query_as::<_, WorkerRow>(&sql)
            .bind(WorkerStatus::Active.as_ref())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Worker::try_from)
            .collect()
    }

    async fn find_attendance(&self, attendance_id: u64) -> StoreResult<Option<AttendanceRecord>> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE id = ?");
        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(attendance_id)
            .fetch_optional(&self.pool)
            .await?
            .map(AttendanceRecord::try_from)
            .transpose()
    }

    async fn find_attendance_for_day(
        &self,
        worker_id: u64,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let sql =
            format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE worker_id = ? AND date = ?");
        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(worker_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?
            .map(AttendanceRecord::try_from)
            .transpose()
    }

    async fn insert_attendance_if_absent(
        &self,
        record: &AttendanceRecord,
    ) -> StoreResult<Option<u64>> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance
                (worker_id, date, check_in, check_in_lat, check_in_lon,
                 check_out, check_out_lat, check_out_lon, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.worker_id)
        .bind(record.date)
        .bind(record.check_in)
        .bind(record.check_in_at.map(|c| c.latitude))
        .bind(record.check_in_at.map(|c| c.longitude))
        .bind(record.check_out)
        .bind(record.check_out_at.map(|c| c.latitude))
        .bind(record.check_out_at.map(|c| c.longitude))
        .bind(record.status.as_ref())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(Some(done.last_insert_id())),
            // (worker_id, date) is taken
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    async fn record_check_in(&self, record: &AttendanceRecord) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_in = ?, check_in_lat = ?, check_in_lon = ?, status = ?
            WHERE id = ?
            AND check_in IS NULL
            AND status <> ?
            "#,
        )
        .bind(record.check_in)
        .bind(record.check_in_at.map(|c| c.latitude))
        .bind(record.check_in_at.map(|c| c.longitude))
        .bind(record.status.as_ref())
        .bind(record.id)
        .bind(AttendanceStatus::Absent.as_ref())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_check_out(&self, record: &AttendanceRecord) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out = ?, check_out_lat = ?, check_out_lon = ?, status = ?
            WHERE id = ?
            AND check_out IS NULL
            AND status <> ?
            "#,
        )
        .bind(record.check_out)
        .bind(record.check_out_at.map(|c| c.latitude))
        .bind(record.check_out_at.map(|c| c.longitude))
        .bind(record.status.as_ref())
        .bind(record.id)
        .bind(AttendanceStatus::Absent.as_ref())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_pending_leave(&self, worker_id: u64) -> StoreResult<Option<LeaveRequest>> {
        let sql = format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE worker_id = ? AND status = ? LIMIT 1"
        );
        sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(worker_id)
            .bind(RequestStatus::Pending.as_ref())
            .fetch_optional(&self.pool)
            .await?
            .map(LeaveRequest::try_from)
            .transpose()
    }

    async fn find_leave(&self, leave_id: u64) -> StoreResult<Option<LeaveRequest>> {
        let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?");
        sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(leave_id)
            .fetch_optional(&self.pool)
            .await?
            .map(LeaveRequest::try_from)
            .transpose()
    }

    async fn insert_leave(&self, leave: &NewLeaveRequest) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (worker_id, requested_on, start_date, end_date, leave_type, description, evidence, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(leave.worker_id)
        .bind(leave.requested_on)
        .bind(leave.start_date)
        .bind(leave.end_date)
        .bind(&leave.leave_type)
        .bind(&leave.description)
        .bind(leave.evidence.as_deref())
        .bind(RequestStatus::Pending.as_ref())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_id())
    }

    async fn approve_leave(
        &self,
        leave_id: u64,
        worker_id: u64,
        days: i32,
        decided_on: NaiveDate,
        motive: &str,
    ) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let debited = sqlx::query(
            r#"
            UPDATE workers
            SET leave_balance = leave_balance - ?
            WHERE id = ?
            AND leave_balance >= ?
            "#,
        )
        .bind(days)
        .bind(worker_id)
        .bind(days)
        .execute(&mut *tx)
        .await?;

        if debited.rows_affected() == 0 {
            return Ok(false);
        }

        let approved = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, approved_on = ?, motive = ?
            WHERE id = ?
            AND status = ?
            "#,
        )
        .bind(RequestStatus::Approved.as_ref())
        .bind(decided_on)
        .bind(motive)
        .bind(leave_id)
        .bind(RequestStatus::Pending.as_ref())
        .execute(&mut *tx)
        .await?;

        if approved.rows_affected() == 0 {
            // dropping the transaction rolls the debit back
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn reject_leave(
        &self,
        leave_id: u64,
        decided_on: NaiveDate,
        motive: &str,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, rejected_on = ?, motive = ?
            WHERE id = ?
            AND status = ?
            "#,
        )
        .bind(RequestStatus::Rejected.as_ref())
        .bind(decided_on)
        .bind(motive)
        .bind(leave_id)
        .bind(RequestStatus::Pending.as_ref())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_pending_justification(
        &self,
        worker_id: u64,
    ) -> StoreResult<Option<Justification>> {
        let sql = format!(
            "SELECT {JUSTIFICATION_COLUMNS} FROM justifications WHERE worker_id = ? AND status = ? LIMIT 1"
        );
        sqlx::query_as::<_, JustificationRow>(&sql)
            .bind(worker_id)
            .bind(RequestStatus::Pending.as_ref())
            .fetch_optional(&self.pool)
            .await?
            .map(Justification::try_from)
            .transpose()
    }

    async fn find_justification(
        &self,
        justification_id: u64,
    ) -> StoreResult<Option<Justification>> {
        let sql = format!("SELECT {JUSTIFICATION_COLUMNS} FROM justifications WHERE id = ?");
        sqlx::query_as::<_, JustificationRow>(&sql)
            .bind(justification_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Justification::try_from)
            .transpose()
    }

    async fn insert_justification(&self, justification: &NewJustification) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO justifications
                (worker_id, attendance_id, submitted_on, description, evidence, status)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(justification.worker_id)
        .bind(justification.attendance_id)
        .bind(justification.submitted_on)
        .bind(&justification.description)
        .bind(justification.evidence.as_deref())
        .bind(RequestStatus::Pending.as_ref())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_id())
    }

    async fn approve_justification(
        &self,
        justification_id: u64,
        attendance_id: u64,
        decided_on: NaiveDate,
        motive: &str,
    ) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let approved = sqlx::query(
            r#"
            UPDATE justifications
            SET status = ?, approved_on = ?, motive = ?
            WHERE id = ?
            AND status = ?
            "#,
        )
        .bind(RequestStatus::Approved.as_ref())
        .bind(decided_on)
        .bind(motive)
        .bind(justification_id)
        .bind(RequestStatus::Pending.as_ref())
        .execute(&mut *tx)
        .await?;

        if approved.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE attendance SET status = ? WHERE id = ?")
            .bind(AttendanceStatus::Justified.as_ref())
            .bind(attendance_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn reject_justification(
        &self,
        justification_id: u64,
        decided_on: NaiveDate,
        motive: &str,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE justifications
            SET status = ?, rejected_on = ?, motive = ?
            WHERE id = ?
            AND status = ?
            "#,
        )
        .bind(RequestStatus::Rejected.as_ref())
        .bind(decided_on)
        .bind(motive)
        .bind(justification_id)
        .bind(RequestStatus::Pending.as_ref())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
