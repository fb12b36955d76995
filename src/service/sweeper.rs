use std::{sync::Arc, time::Duration};

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use tokio::{sync::Mutex, task::AbortHandle};
use utoipa::ToSchema;

use crate::model::attendance::AttendanceRecord;
use crate::store::{Store, StoreError};
use crate::utils::clock::Clock;

/// Counts from one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct SweepReport {
    /// Absent records written by this sweep
    pub created: u32,
    /// Workers that already had a record for the day
    pub existing: u32,
    /// Workers whose record could not be written
    pub failed: u32,
}

/// Marks every active worker without a record for the day as absent.
pub struct AbsenceSweeper {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    sweep_at: NaiveTime,
    last_swept: Mutex<Option<NaiveDate>>,
}

impl AbsenceSweeper {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, sweep_at: NaiveTime) -> Self {
        Self {
            store,
            clock,
            sweep_at,
            last_swept: Mutex::new(None),
        }
    }

    /// Sweeps the current server date regardless of the time of day.
    pub async fn sweep_absences(&self) -> Result<SweepReport, StoreError> {
        let today = self.clock.now().date_naive();
        self.sweep_day(today).await
    }

    async fn sweep_day(&self, date: NaiveDate) -> Result<SweepReport, StoreError> {
        let workers = self.store.list_active_workers().await?;
        let mut report = SweepReport::default();

        for worker in workers {
            let record = AttendanceRecord::absent(worker.id, date);
            match self.store.insert_attendance_if_absent(&record).await {
                Ok(Some(_)) => report.created += 1,
                Ok(None) => report.existing += 1,
                Err(e) => {
                    tracing::error!(error = %e, worker_id = worker.id, %date, "Failed to record absence");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            %date,
            created = report.created,
            existing = report.existing,
            failed = report.failed,
            "Absence sweep finished"
        );

        Ok(report)
    }

    /// Runs the sweep on the first call at or after the cutoff each day.
    /// Returns `None` when nothing ran.
    pub async fn tick(&self) -> Option<SweepReport> {
        let now = self.clock.now();
        if now.time() < self.sweep_at {
            return None;
        }

        let today = now.date_naive();
        let mut last_swept = self.last_swept.lock().await;
        if *last_swept == Some(today) {
            return None;
        }

        match self.sweep_day(today).await {
            Ok(report) => {
                *last_swept = Some(today);
                Some(report)
            }
            Err(e) => {
                // next tick retries
                tracing::error!(error = %e, date = %today, "Absence sweep aborted");
                None
            }
        }
    }

    /// Spawns the recurring sweep on the current runtime.
    pub fn start(self: Arc<Self>, every: Duration) -> SweeperHandle {
        tracing::info!(every_secs = every.as_secs(), sweep_at = %self.sweep_at, "Absence sweeper started");

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                self.tick().await;
            }
        });

        SweeperHandle {
            abort: task.abort_handle(),
        }
    }
}

pub struct SweeperHandle {
    abort: AbortHandle,
}

impl SweeperHandle {
    pub fn stop(self) {
        self.abort.abort();
        tracing::info!("Absence sweeper stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceStatus;
    use crate::model::worker::WorkerStatus;
    use crate::store::memory::{MemoryStore, fixtures};
    use crate::utils::clock::FixedClock;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn setup(h: u32, m: u32, s: u32) -> (Arc<MemoryStore>, Arc<FixedClock>, AbsenceSweeper) {
        let store = Arc::new(MemoryStore::new());
        for id in 1..=3 {
            store.add_worker(fixtures::worker(id));
        }
        let clock = Arc::new(FixedClock::at(day(), h, m, s));
        let sweeper = AbsenceSweeper::new(
            store.clone(),
            clock.clone(),
            NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
        );
        (store, clock, sweeper)
    }

    #[actix_web::test]
    async fn sweep_is_idempotent() {
        let (store, _clock, sweeper) = setup(23, 0, 0);
        store.add_attendance(AttendanceRecord {
            check_in: NaiveTime::from_hms_opt(8, 0, 0),
            status: AttendanceStatus::Present,
            ..AttendanceRecord::absent(2, day())
        });

        let first = sweeper.sweep_absences().await.unwrap();
        assert_eq!(
            first,
            SweepReport {
                created: 2,
                existing: 1,
                failed: 0
            }
        );

        let second = sweeper.sweep_absences().await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.existing, 3);

        let absent = store
            .attendance()
            .into_iter()
            .filter(|r| r.status == AttendanceStatus::Absent)
            .count();
        assert_eq!(absent, 2);
    }

    #[actix_web::test]
    async fn sweep_skips_inactive_workers() {
        let (store, _clock, sweeper) = setup(23, 0, 0);
        let mut retired = fixtures::worker(9);
        retired.status = WorkerStatus::Inactive;
        store.add_worker(retired);

        sweeper.sweep_absences().await.unwrap();
        assert!(store.attendance().iter().all(|r| r.worker_id != 9));
    }

    #[actix_web::test]
    async fn sweep_continues_past_failing_worker() {
        let (store, _clock, sweeper) = setup(23, 0, 0);
        store.fail_writes_for(2);

        let report = sweeper.sweep_absences().await.unwrap();
        assert_eq!(report.created, 2);
        assert_eq!(report.failed, 1);
    }

    #[actix_web::test]
    async fn tick_waits_for_cutoff() {
        let (store, _clock, sweeper) = setup(22, 59, 59);
        assert!(sweeper.tick().await.is_none());
        assert!(store.attendance().is_empty());
    }

    #[actix_web::test]
    async fn tick_fires_once_per_day() {
        let (store, clock, sweeper) = setup(23, 0, 0);
        assert!(sweeper.tick().await.is_some());

        clock.set(day(), 23, 0, 30);
        assert!(sweeper.tick().await.is_none());
        assert_eq!(store.attendance().len(), 3);

        let next = day().succ_opt().unwrap();
        clock.set(next, 23, 0, 10);
        assert!(sweeper.tick().await.is_some());
        assert_eq!(store.attendance().len(), 6);
    }

    #[actix_web::test]
    async fn late_tick_still_fires() {
        let (store, _clock, sweeper) = setup(23, 41, 7);
        let report = sweeper.tick().await.unwrap();
        assert_eq!(report.created, 3);
        assert_eq!(store.attendance().len(), 3);
    }

    #[actix_web::test]
    async fn started_sweeper_runs_and_stops() {
        let (store, _clock, sweeper) = setup(23, 5, 0);
        let handle = Arc::new(sweeper).start(Duration::from_millis(10));

        // the first interval tick completes immediately
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop();

        assert_eq!(store.attendance().len(), 3);
    }
}
