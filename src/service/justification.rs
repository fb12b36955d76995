use std::sync::Arc;

use crate::error::WorkflowError;
use crate::model::attendance::AttendanceStatus;
use crate::model::justification::{Justification, NewJustification};
use crate::model::leave_request::RequestStatus;
use crate::store::Store;
use crate::utils::clock::Clock;

pub struct JustificationService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl JustificationService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Files a justification against one of the worker's own absent or late days.
    pub async fn submit(
        &self,
        worker_id: u64,
        attendance_id: u64,
        description: String,
        evidence: Option<Vec<u8>>,
    ) -> Result<Justification, WorkflowError> {
        let record = self
            .store
            .find_attendance(attendance_id)
            .await?
            .filter(|r| r.worker_id == worker_id)
            .ok_or(WorkflowError::NotFound("Attendance record"))?;
        if !record.status.is_justifiable() {
            return Err(WorkflowError::NotJustifiable);
        }
        if self
            .store
            .find_pending_justification(worker_id)
            .await?
            .is_some()
        {
            return Err(WorkflowError::PendingJustificationExists);
        }

        let new = NewJustification {
            worker_id,
            attendance_id,
            submitted_on: self.clock.now().date_naive(),
            description,
            evidence,
        };
        let id = self.store.insert_justification(&new).await?;

        tracing::info!(worker_id, attendance_id, justification_id = id, "Justification submitted");

        Ok(Justification {
            id,
            worker_id,
            attendance_id,
            submitted_on: new.submitted_on,
            description: new.description,
            evidence: new.evidence,
            status: RequestStatus::Pending,
            approved_on: None,
            rejected_on: None,
            motive: None,
        })
    }

    /// Approves and marks the linked attendance record `Justified`.
    pub async fn approve(
        &self,
        justification_id: u64,
        motive: &str,
    ) -> Result<Justification, WorkflowError> {
        let justification = self.pending(justification_id).await?;
        let decided_on = self.clock.now().date_naive();

        if !self
            .store
            .approve_justification(
                justification_id,
                justification.attendance_id,
                decided_on,
                motive,
            )
            .await?
        {
            return Err(WorkflowError::AlreadyProcessed);
        }

        tracing::info!(
            justification_id,
            attendance_id = justification.attendance_id,
            status = %AttendanceStatus::Justified,
            "Justification approved"
        );

        Ok(Justification {
            status: RequestStatus::Approved,
            approved_on: Some(decided_on),
            motive: Some(motive.to_string()),
            ..justification
        })
    }

    pub async fn reject(
        &self,
        justification_id: u64,
        motive: &str,
    ) -> Result<Justification, WorkflowError> {
        let justification = self.pending(justification_id).await?;
        let decided_on = self.clock.now().date_naive();

        if !self
            .store
            .reject_justification(justification_id, decided_on, motive)
            .await?
        {
            return Err(WorkflowError::AlreadyProcessed);
        }

        tracing::info!(justification_id, "Justification rejected");

        Ok(Justification {
            status: RequestStatus::Rejected,
            rejected_on: Some(decided_on),
            motive: Some(motive.to_string()),
            ..justification
        })
    }

    async fn pending(&self, justification_id: u64) -> Result<Justification, WorkflowError> {
        let justification = self
            .store
            .find_justification(justification_id)
            .await?
            .ok_or(WorkflowError::NotFound("Justification"))?;
        if justification.status != RequestStatus::Pending {
            return Err(WorkflowError::AlreadyProcessed);
        }
        Ok(justification)
    }
}
