use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::AttendanceError;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, Coordinates};
use crate::store::Store;
use crate::utils::{clock::Clock, geo::GeoFence};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceKind {
    CheckIn,
    CheckOut,
}

/// Where workers may register and when an arrival counts as late.
#[derive(Debug, Clone, Copy)]
pub struct SitePolicy {
    pub fence: GeoFence,
    /// Arrivals strictly after this time of day are late.
    pub late_after: NaiveTime,
}

/// Storage write produced by a successful validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// No row exists for the day yet.
    Insert(AttendanceRecord),
    /// Existing row without a check-in.
    CheckIn(AttendanceRecord),
    CheckOut(AttendanceRecord),
}

/// Applies the check-in/check-out rules to today's record without touching storage.
pub fn evaluate(
    kind: AttendanceKind,
    worker_id: u64,
    at: Coordinates,
    now: NaiveDateTime,
    today: Option<&AttendanceRecord>,
    policy: &SitePolicy,
) -> Result<Transition, AttendanceError> {
    let distance = policy.fence.distance_from_center(at);
    if !policy.fence.contains(at) {
        return Err(AttendanceError::OutOfRange {
            distance_meters: distance,
        });
    }

    if today.is_some_and(|r| r.status == AttendanceStatus::Absent) {
        return Err(AttendanceError::AlreadyAbsent);
    }

    let time = now.time();
    match kind {
        AttendanceKind::CheckIn => {
            let status = if time > policy.late_after {
                AttendanceStatus::Late
            } else {
                AttendanceStatus::Present
            };

            match today {
                Some(record) if record.check_in.is_some() => Err(AttendanceError::DuplicateCheckIn),
                Some(record) => Ok(Transition::CheckIn(AttendanceRecord {
                    check_in: Some(time),
                    check_in_at: Some(at),
                    status,
                    ..record.clone()
                })),
                None => Ok(Transition::Insert(AttendanceRecord {
                    id: 0,
                    worker_id,
                    date: now.date(),
                    check_in: Some(time),
                    check_in_at: Some(at),
                    check_out: None,
                    check_out_at: None,
                    status,
                })),
            }
        }
        AttendanceKind::CheckOut => {
            let Some(record) = today else {
                return Err(AttendanceError::NoCheckInRecord);
            };
            if record.check_out.is_some() {
                return Err(AttendanceError::DuplicateCheckOut);
            }

            // a late arrival stays flagged after leaving
            let status = match record.status {
                AttendanceStatus::Late => AttendanceStatus::Late,
                _ => AttendanceStatus::CheckedOut,
            };

            Ok(Transition::CheckOut(AttendanceRecord {
                check_out: Some(time),
                check_out_at: Some(at),
                status,
                ..record.clone()
            }))
        }
    }
}

pub struct AttendanceService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    policy: SitePolicy,
}

impl AttendanceService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, policy: SitePolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &SitePolicy {
        &self.policy
    }

    /// Trusted server time in the site's zone.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now()
    }

    pub async fn today(&self, worker_id: u64) -> Result<Option<AttendanceRecord>, AttendanceError> {
        let date = self.clock.now().date_naive();
        Ok(self.store.find_attendance_for_day(worker_id, date).await?)
    }

    /// Validates and persists a check-in or check-out at the server's current time.
    pub async fn register_attendance(
        &self,
        worker_id: u64,
        kind: AttendanceKind,
        at: Coordinates,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let now = self.clock.now().naive_local();
        let date = now.date();

        let today = self.store.find_attendance_for_day(worker_id, date).await?;
        let transition = evaluate(kind, worker_id, at, now, today.as_ref(), &self.policy)?;

        let record = match transition {
            Transition::Insert(mut record) => {
                match self.store.insert_attendance_if_absent(&record).await? {
                    Some(id) => {
                        record.id = id;
                        record
                    }
                    None => {
                        return Err(self
                            .lost_race(worker_id, date, AttendanceError::DuplicateCheckIn)
                            .await);
                    }
                }
            }
            Transition::CheckIn(record) => {
                if !self.store.record_check_in(&record).await? {
                    return Err(self
                        .lost_race(worker_id, date, AttendanceError::DuplicateCheckIn)
                        .await);
                }
                record
            }
            Transition::CheckOut(record) => {
                if !self.store.record_check_out(&record).await? {
                    return Err(self
                        .lost_race(worker_id, date, AttendanceError::DuplicateCheckOut)
                        .await);
                }
                record
            }
        };

        tracing::info!(
            worker_id,
            date = %record.date,
            status = %record.status,
            kind = ?kind,
            "Attendance registered"
        );

        Ok(record)
    }

    /// A concurrent write beat us to the row. Reports `AlreadyAbsent` when it
    /// was the absence sweep, `fallback` otherwise.
    async fn lost_race(
        &self,
        worker_id: u64,
        date: NaiveDate,
        fallback: AttendanceError,
    ) -> AttendanceError {
        match self.store.find_attendance_for_day(worker_id, date).await {
            Ok(Some(record)) if record.status == AttendanceStatus::Absent => {
                AttendanceError::AlreadyAbsent
            }
            Ok(_) => fallback,
            Err(e) => AttendanceError::Store(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{MemoryStore, fixtures};
    use crate::utils::clock::FixedClock;

    const SITE: Coordinates = Coordinates {
        latitude: -5.224747,
        longitude: -80.630393,
    };

    fn policy() -> SitePolicy {
        SitePolicy {
            fence: GeoFence::new(SITE, 100.0),
            late_after: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, s).unwrap()
    }

    fn setup(h: u32, m: u32, s: u32) -> (Arc<MemoryStore>, Arc<FixedClock>, AttendanceService) {
        let store = Arc::new(MemoryStore::new());
        store.add_worker(fixtures::worker(1));
        let clock = Arc::new(FixedClock::at(day(), h, m, s));
        let service = AttendanceService::new(store.clone(), clock.clone(), policy());
        (store, clock, service)
    }

    fn check_in_status(h: u32, m: u32, s: u32) -> AttendanceStatus {
        match evaluate(AttendanceKind::CheckIn, 1, SITE, at(h, m, s), None, &policy()) {
            Ok(Transition::Insert(record)) => record.status,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn late_is_strictly_after_cutoff() {
        assert_eq!(check_in_status(8, 59, 59), AttendanceStatus::Present);
        assert_eq!(check_in_status(9, 0, 0), AttendanceStatus::Present);
        assert_eq!(check_in_status(9, 0, 1), AttendanceStatus::Late);
    }

    #[test]
    fn out_of_range_is_checked_first() {
        let far = Coordinates::new(-5.234747, -80.630393);
        let absent = AttendanceRecord::absent(1, day());

        let err = evaluate(
            AttendanceKind::CheckIn,
            1,
            far,
            at(8, 0, 0),
            Some(&absent),
            &policy(),
        )
        .unwrap_err();
        assert!(matches!(err, AttendanceError::OutOfRange { distance_meters } if distance_meters > 100.0));
    }

    #[test]
    fn absent_day_refuses_both_kinds() {
        let absent = AttendanceRecord::absent(1, day());
        for kind in [AttendanceKind::CheckIn, AttendanceKind::CheckOut] {
            let err = evaluate(kind, 1, SITE, at(8, 0, 0), Some(&absent), &policy()).unwrap_err();
            assert!(matches!(err, AttendanceError::AlreadyAbsent));
        }
    }

    #[test]
    fn check_out_keeps_late() {
        let late = AttendanceRecord {
            id: 4,
            check_in: Some(NaiveTime::from_hms_opt(9, 30, 0).unwrap()),
            check_in_at: Some(SITE),
            status: AttendanceStatus::Late,
            ..AttendanceRecord::absent(1, day())
        };

        match evaluate(AttendanceKind::CheckOut, 1, SITE, at(17, 0, 0), Some(&late), &policy()) {
            Ok(Transition::CheckOut(record)) => {
                assert_eq!(record.status, AttendanceStatus::Late);
                assert_eq!(record.check_out, NaiveTime::from_hms_opt(17, 0, 0));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn justified_day_can_still_check_out() {
        let justified = AttendanceRecord {
            id: 7,
            status: AttendanceStatus::Justified,
            ..AttendanceRecord::absent(1, day())
        };

        match evaluate(AttendanceKind::CheckOut, 1, SITE, at(17, 0, 0), Some(&justified), &policy()) {
            Ok(Transition::CheckOut(record)) => {
                assert_eq!(record.id, 7);
                assert_eq!(record.check_in, None);
                assert_eq!(record.check_out, NaiveTime::from_hms_opt(17, 0, 0));
                assert_eq!(record.status, AttendanceStatus::CheckedOut);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[actix_web::test]
    async fn check_in_then_check_out() {
        let (store, clock, service) = setup(8, 0, 0);

        let record = service
            .register_attendance(1, AttendanceKind::CheckIn, SITE)
            .await
            .unwrap();
        assert_eq!(record.status, AttendanceStatus::Present);
        assert_eq!(record.check_in, NaiveTime::from_hms_opt(8, 0, 0));
        assert_eq!(store.attendance().len(), 1);

        clock.set(day(), 17, 0, 0);
        let record = service
            .register_attendance(1, AttendanceKind::CheckOut, SITE)
            .await
            .unwrap();
        assert_eq!(record.status, AttendanceStatus::CheckedOut);

        let stored = &store.attendance()[0];
        assert_eq!(stored.status, AttendanceStatus::CheckedOut);
        assert_eq!(stored.check_out, NaiveTime::from_hms_opt(17, 0, 0));
        assert_eq!(stored.check_out_at, Some(SITE));
    }

    #[actix_web::test]
    async fn second_check_in_is_rejected_and_record_untouched() {
        let (store, clock, service) = setup(8, 0, 0);
        service
            .register_attendance(1, AttendanceKind::CheckIn, SITE)
            .await
            .unwrap();
        let before = store.attendance();

        clock.set(day(), 10, 0, 0);
        let err = service
            .register_attendance(1, AttendanceKind::CheckIn, SITE)
            .await
            .unwrap_err();

        assert!(matches!(err, AttendanceError::DuplicateCheckIn));
        assert_eq!(store.attendance(), before);
    }

    #[actix_web::test]
    async fn check_out_without_check_in() {
        let (_store, _clock, service) = setup(17, 0, 0);
        let err = service
            .register_attendance(1, AttendanceKind::CheckOut, SITE)
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::NoCheckInRecord));
    }

    #[actix_web::test]
    async fn second_check_out_is_rejected() {
        let (_store, clock, service) = setup(8, 0, 0);
        service
            .register_attendance(1, AttendanceKind::CheckIn, SITE)
            .await
            .unwrap();
        clock.set(day(), 17, 0, 0);
        service
            .register_attendance(1, AttendanceKind::CheckOut, SITE)
            .await
            .unwrap();

        let err = service
            .register_attendance(1, AttendanceKind::CheckOut, SITE)
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::DuplicateCheckOut));
    }

    #[actix_web::test]
    async fn late_survives_check_out() {
        let (store, clock, service) = setup(9, 15, 0);
        service
            .register_attendance(1, AttendanceKind::CheckIn, SITE)
            .await
            .unwrap();
        clock.set(day(), 18, 0, 0);
        service
            .register_attendance(1, AttendanceKind::CheckOut, SITE)
            .await
            .unwrap();

        let stored = &store.attendance()[0];
        assert_eq!(stored.status, AttendanceStatus::Late);
        assert!(stored.check_out.is_some());
    }

    #[actix_web::test]
    async fn check_in_after_sweep_is_already_absent() {
        let (store, _clock, service) = setup(23, 30, 0);
        store.add_attendance(AttendanceRecord::absent(1, day()));

        let err = service
            .register_attendance(1, AttendanceKind::CheckIn, SITE)
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::AlreadyAbsent));
    }

    #[actix_web::test]
    async fn sweep_landing_before_insert_reports_already_absent() {
        let (store, _clock, service) = setup(8, 0, 0);
        store.write_after_next_read(AttendanceRecord::absent(1, day()));

        let err = service
            .register_attendance(1, AttendanceKind::CheckIn, SITE)
            .await
            .unwrap_err();

        assert!(matches!(err, AttendanceError::AlreadyAbsent));
        let rows = store.attendance();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, AttendanceStatus::Absent);
    }

    #[actix_web::test]
    async fn concurrent_insert_reports_duplicate_check_in() {
        let (store, _clock, service) = setup(8, 0, 0);
        store.write_after_next_read(AttendanceRecord {
            check_in: NaiveTime::from_hms_opt(7, 59, 58),
            check_in_at: Some(SITE),
            status: AttendanceStatus::Present,
            ..AttendanceRecord::absent(1, day())
        });

        let err = service
            .register_attendance(1, AttendanceKind::CheckIn, SITE)
            .await
            .unwrap_err();

        assert!(matches!(err, AttendanceError::DuplicateCheckIn));
        assert_eq!(store.attendance()[0].check_in, NaiveTime::from_hms_opt(7, 59, 58));
    }

    #[actix_web::test]
    async fn concurrent_fill_reports_duplicate_check_in() {
        let (store, _clock, service) = setup(8, 0, 0);
        let justified = AttendanceRecord {
            status: AttendanceStatus::Justified,
            ..AttendanceRecord::absent(1, day())
        };
        let id = store.add_attendance(justified.clone());
        store.write_after_next_read(AttendanceRecord {
            id,
            check_in: NaiveTime::from_hms_opt(7, 59, 58),
            check_in_at: Some(SITE),
            status: AttendanceStatus::Present,
            ..justified
        });

        let err = service
            .register_attendance(1, AttendanceKind::CheckIn, SITE)
            .await
            .unwrap_err();

        assert!(matches!(err, AttendanceError::DuplicateCheckIn));
    }

    #[actix_web::test]
    async fn concurrent_check_out_reports_duplicate_check_out() {
        let (store, clock, service) = setup(8, 0, 0);
        let record = service
            .register_attendance(1, AttendanceKind::CheckIn, SITE)
            .await
            .unwrap();
        store.write_after_next_read(AttendanceRecord {
            check_out: NaiveTime::from_hms_opt(16, 59, 59),
            check_out_at: Some(SITE),
            status: AttendanceStatus::CheckedOut,
            ..record
        });

        clock.set(day(), 17, 0, 0);
        let err = service
            .register_attendance(1, AttendanceKind::CheckOut, SITE)
            .await
            .unwrap_err();

        assert!(matches!(err, AttendanceError::DuplicateCheckOut));
        assert_eq!(store.attendance()[0].check_out, NaiveTime::from_hms_opt(16, 59, 59));
    }

    #[actix_web::test]
    async fn justified_absence_accepts_check_out() {
        let (store, _clock, service) = setup(17, 0, 0);
        store.add_attendance(AttendanceRecord {
            status: AttendanceStatus::Justified,
            ..AttendanceRecord::absent(1, day())
        });

        let record = service
            .register_attendance(1, AttendanceKind::CheckOut, SITE)
            .await
            .unwrap();

        assert_eq!(record.status, AttendanceStatus::CheckedOut);
        let stored = &store.attendance()[0];
        assert_eq!(stored.check_out, NaiveTime::from_hms_opt(17, 0, 0));
        assert_eq!(stored.check_in, None);
    }
}
