use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::WorkflowError;
use crate::model::leave_request::{LeaveRequest, NewLeaveRequest, RequestStatus};
use crate::store::Store;
use crate::utils::clock::Clock;

/// Fields a worker supplies when asking for leave.
#[derive(Debug, Clone)]
pub struct LeaveSubmission {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub leave_type: String,
    pub description: String,
    pub evidence: Option<Vec<u8>>,
}

pub struct LeaveService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl LeaveService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn submit(
        &self,
        worker_id: u64,
        submission: LeaveSubmission,
    ) -> Result<LeaveRequest, WorkflowError> {
        if submission.start_date > submission.end_date {
            return Err(WorkflowError::InvalidDateRange);
        }
        if self.store.find_pending_leave(worker_id).await?.is_some() {
            return Err(WorkflowError::PendingLeaveExists);
        }

        let new = NewLeaveRequest {
            worker_id,
            requested_on: self.clock.now().date_naive(),
            start_date: submission.start_date,
            end_date: submission.end_date,
            leave_type: submission.leave_type,
            description: submission.description,
            evidence: submission.evidence,
        };
        let id = self.store.insert_leave(&new).await?;

        tracing::info!(worker_id, leave_id = id, "Leave request submitted");

        Ok(LeaveRequest {
            id,
            worker_id,
            requested_on: new.requested_on,
            start_date: new.start_date,
            end_date: new.end_date,
            leave_type: new.leave_type,
            description: new.description,
            evidence: new.evidence,
            status: RequestStatus::Pending,
            approved_on: None,
            rejected_on: None,
            motive: None,
        })
    }

    /// Approves the request and debits the inclusive day span from the
    /// worker's balance. Nothing changes when the balance is short.
    pub async fn approve(&self, leave_id: u64, motive: &str) -> Result<LeaveRequest, WorkflowError> {
        let leave = self.pending(leave_id).await?;
        let worker = self
            .store
            .find_worker(leave.worker_id)
            .await?
            .ok_or(WorkflowError::NotFound("Worker"))?;

        let days = leave.day_span();
        let insufficient = WorkflowError::InsufficientLeaveBalance {
            requested: days,
            available: worker.leave_balance,
        };
        let Ok(days_i32) = i32::try_from(days) else {
            return Err(insufficient);
        };
        if worker.leave_balance < days_i32 {
            return Err(insufficient);
        }

        let decided_on = self.clock.now().date_naive();
        if !self
            .store
            .approve_leave(leave_id, leave.worker_id, days_i32, decided_on, motive)
            .await?
        {
            // lost a race: either decided elsewhere or the balance moved
            return Err(match self.pending(leave_id).await {
                Ok(_) => insufficient,
                Err(e) => e,
            });
        }

        tracing::info!(leave_id, worker_id = leave.worker_id, days, "Leave request approved");

        Ok(LeaveRequest {
            status: RequestStatus::Approved,
            approved_on: Some(decided_on),
            motive: Some(motive.to_string()),
            ..leave
        })
    }

    pub async fn reject(&self, leave_id: u64, motive: &str) -> Result<LeaveRequest, WorkflowError> {
        let leave = self.pending(leave_id).await?;
        let decided_on = self.clock.now().date_naive();

        if !self.store.reject_leave(leave_id, decided_on, motive).await? {
            return Err(WorkflowError::AlreadyProcessed);
        }

        tracing::info!(leave_id, worker_id = leave.worker_id, "Leave request rejected");

        Ok(LeaveRequest {
            status: RequestStatus::Rejected,
            rejected_on: Some(decided_on),
            motive: Some(motive.to_string()),
            ..leave
        })
    }

    async fn pending(&self, leave_id: u64) -> Result<LeaveRequest, WorkflowError> {
        let leave = self
            .store
            .find_leave(leave_id)
            .await?
            .ok_or(WorkflowError::NotFound("Leave request"))?;
        if leave.status != RequestStatus::Pending {
            return Err(WorkflowError::AlreadyProcessed);
        }
        Ok(leave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{MemoryStore, fixtures};
    use crate::utils::clock::FixedClock;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn setup(balance: i32) -> (Arc<MemoryStore>, LeaveService) {
        let store = Arc::new(MemoryStore::new());
        let mut worker = fixtures::worker(1);
        worker.leave_balance = balance;
        store.add_worker(worker);
        let clock = Arc::new(FixedClock::at(date(1), 10, 0, 0));
        (store.clone(), LeaveService::new(store, clock))
    }

    fn submission(start: u32, end: u32) -> LeaveSubmission {
        LeaveSubmission {
            start_date: date(start),
            end_date: date(end),
            leave_type: "personal".into(),
            description: "Family matter".into(),
            evidence: None,
        }
    }

    #[actix_web::test]
    async fn submit_creates_pending_request() {
        let (store, service) = setup(15);
        let leave = service.submit(1, submission(2, 3)).await.unwrap();

        assert_eq!(leave.status, RequestStatus::Pending);
        assert_eq!(leave.requested_on, date(1));
        assert_eq!(store.leave(leave.id), Some(leave));
    }

    #[actix_web::test]
    async fn second_pending_request_is_rejected() {
        let (_store, service) = setup(15);
        service.submit(1, submission(2, 3)).await.unwrap();

        let err = service.submit(1, submission(9, 10)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::PendingLeaveExists));
    }

    #[actix_web::test]
    async fn reversed_range_is_rejected() {
        let (_store, service) = setup(15);
        let err = service.submit(1, submission(5, 2)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidDateRange));
    }

    #[actix_web::test]
    async fn approval_beyond_balance_changes_nothing() {
        let (store, service) = setup(3);
        let leave = service.submit(1, submission(2, 6)).await.unwrap();

        let err = service.approve(leave.id, "ok").await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InsufficientLeaveBalance {
                requested: 5,
                available: 3
            }
        ));
        assert_eq!(store.worker(1).unwrap().leave_balance, 3);
        assert_eq!(store.leave(leave.id).unwrap().status, RequestStatus::Pending);
    }

    #[actix_web::test]
    async fn approval_debits_inclusive_span() {
        let (store, service) = setup(3);
        let leave = service.submit(1, submission(2, 3)).await.unwrap();

        let approved = service.approve(leave.id, "Enjoy").await.unwrap();
        assert_eq!(approved.status, RequestStatus::Approved);
        assert_eq!(approved.approved_on, Some(date(1)));
        assert_eq!(store.worker(1).unwrap().leave_balance, 1);
        assert_eq!(store.leave(leave.id).unwrap().motive.as_deref(), Some("Enjoy"));
    }

    #[actix_web::test]
    async fn decided_requests_are_final() {
        let (store, service) = setup(15);
        let leave = service.submit(1, submission(2, 2)).await.unwrap();
        service.reject(leave.id, "Busy week").await.unwrap();

        assert!(matches!(
            service.approve(leave.id, "ok").await.unwrap_err(),
            WorkflowError::AlreadyProcessed
        ));
        assert_eq!(store.worker(1).unwrap().leave_balance, 15);

        // a new request is allowed once nothing is pending
        service.submit(1, submission(9, 9)).await.unwrap();
    }

    #[actix_web::test]
    async fn unknown_request() {
        let (_store, service) = setup(15);
        assert!(matches!(
            service.reject(42, "no").await.unwrap_err(),
            WorkflowError::NotFound(_)
        ));
    }
}
