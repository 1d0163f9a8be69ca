// service/availability_service.rs
//
// Read-only slot computation over working hours, holidays and blocking
// bookings. The interval arithmetic is kept in plain functions so it can
// be exercised without a database; the service methods wire them to the
// stores.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{
        bookingdb::BookingExt,
        consultantdb::ConsultantExt,
        db::DBClient,
    },
    models::bookingmodel::{Bookable, Booking},
    service::{
        error::ServiceError,
        terms::{resolve_terms, BookingTerms},
    },
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SlotValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SlotValidation {
    pub fn ok() -> Self {
        SlotValidation {
            valid: true,
            reason: None,
            message: None,
        }
    }

    pub fn rejected(reason: &'static str, message: impl Into<String>) -> Self {
        SlotValidation {
            valid: false,
            reason: Some(reason),
            message: Some(message.into()),
        }
    }
}

/// Half-open range overlap: `[a_start, a_end)` against `[b_start, b_end)`.
pub fn ranges_overlap<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && b_start < a_end
}

fn minutes_of(t: NaiveTime) -> i32 {
    (t.hour() * 60 + t.minute()) as i32
}

/// Whether `[start_min, end_min)` (minutes from midnight) is fully
/// contained in at least one of the intervals. Containment in any single
/// interval suffices; spanning two adjacent intervals does not.
pub fn fits_in_any_interval(intervals: &[(NaiveTime, NaiveTime)], start_min: i32, end_min: i32) -> bool {
    intervals.iter().any(|(iv_start, iv_end)| {
        start_min >= minutes_of(*iv_start) && end_min <= minutes_of(*iv_end)
    })
}

/// Candidate starts inside one working-hour interval: from the interval's
/// start in `granularity` steps, keeping candidates whose full occupation
/// (duration + buffer) still fits before the interval's end.
pub fn slide_candidates(
    iv_start: NaiveTime,
    iv_end: NaiveTime,
    occupied_minutes: i32,
    granularity_minutes: i32,
) -> Vec<i32> {
    let start = minutes_of(iv_start);
    let end = minutes_of(iv_end);

    let mut candidates = Vec::new();
    let mut cursor = start;
    while cursor + occupied_minutes <= end {
        candidates.push(cursor);
        cursor += granularity_minutes;
    }
    candidates
}

fn occupied_range(booking: &Booking) -> (DateTime<Utc>, DateTime<Utc>) {
    (booking.start_at, booking.occupied_end())
}

#[derive(Debug, Clone)]
pub struct AvailabilityService {
    db_client: Arc<DBClient>,
}

impl AvailabilityService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    pub async fn is_holiday(
        &self,
        consultant_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool, ServiceError> {
        Ok(self.db_client.is_holiday(consultant_id, date).await?)
    }

    /// Active working-hour intervals for one weekday (0 = Sunday).
    pub async fn working_hours_for_day(
        &self,
        consultant_id: Uuid,
        day_of_week: i16,
    ) -> Result<Vec<(NaiveTime, NaiveTime)>, ServiceError> {
        let hours = self
            .db_client
            .get_active_working_hours_for_day(consultant_id, day_of_week)
            .await?;
        Ok(hours.into_iter().map(|h| (h.start_time, h.end_time)).collect())
    }

    /// Time-of-day containment of `[start_at, end_at]` in any one active
    /// interval of `start_at`'s weekday.
    pub async fn fits_in_working_hours(
        &self,
        consultant_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        let day_of_week = start_at.weekday().num_days_from_sunday() as i16;
        let intervals = self.working_hours_for_day(consultant_id, day_of_week).await?;

        let start_min = minutes_of(start_at.time());
        // An occupation running past midnight cannot fit a same-day interval.
        let end_min = start_min + (end_at - start_at).num_minutes() as i32;

        Ok(fits_in_any_interval(&intervals, start_min, end_min))
    }

    /// Ordered checks: holiday, working hours (with buffer), then blocking
    /// overlaps. The first failing check decides the reason; none is
    /// skipped when an earlier one passes.
    pub async fn validate_slot(
        &self,
        consultant_id: Uuid,
        start_at: DateTime<Utc>,
        duration_minutes: i32,
        buffer_after_minutes: i32,
        exclude_booking_id: Option<Uuid>,
    ) -> Result<SlotValidation, ServiceError> {
        if self.is_holiday(consultant_id, start_at.date_naive()).await? {
            return Ok(SlotValidation::rejected(
                "holiday_conflict",
                "The selected date is a holiday for this consultant",
            ));
        }

        let occupied_end =
            start_at + Duration::minutes((duration_minutes + buffer_after_minutes) as i64);
        if !self
            .fits_in_working_hours(consultant_id, start_at, occupied_end)
            .await?
        {
            return Ok(SlotValidation::rejected(
                "outside_working_hours",
                "The requested slot falls outside the consultant's working hours",
            ));
        }

        let overlaps = self
            .db_client
            .find_blocking_overlaps(consultant_id, start_at, occupied_end, exclude_booking_id)
            .await?;
        if !overlaps.is_empty() {
            return Ok(SlotValidation::rejected(
                "slot_unavailable",
                "The requested slot is no longer available",
            ));
        }

        Ok(SlotValidation::ok())
    }

    /// Free slot starts ("HH:MM") for one consultant and date. Empty on a
    /// holiday or a day without active working hours. Each interval is
    /// swept independently in `granularity_minutes` steps; candidates that
    /// are already in the past, or whose occupation overlaps a blocking
    /// booking, are dropped. Output follows interval order, chronological
    /// within each interval, without cross-interval dedup (interval
    /// non-overlap is enforced at write time).
    pub async fn available_slots(
        &self,
        consultant_id: Uuid,
        date: NaiveDate,
        bookable: Option<Bookable>,
        requested_duration: Option<i32>,
        granularity_minutes: i32,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, ServiceError> {
        if self.is_holiday(consultant_id, date).await? {
            return Ok(vec![]);
        }

        let day_start = date
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always a valid time")
            .and_utc();
        let day_of_week = date.weekday().num_days_from_sunday() as i16;

        let hours = self
            .db_client
            .get_active_working_hours_for_day(consultant_id, day_of_week)
            .await?;
        if hours.is_empty() {
            return Ok(vec![]);
        }

        let terms = self
            .resolve_slot_terms(consultant_id, bookable, requested_duration)
            .await?;
        let occupied_minutes = terms.duration_minutes + terms.buffer_after_minutes;

        let day_end = day_start + Duration::days(1);
        let busy = self
            .db_client
            .blocking_bookings_in_window(consultant_id, day_start, day_end)
            .await?;

        let mut slots = Vec::new();
        for interval in &hours {
            for candidate_min in slide_candidates(
                interval.start_time,
                interval.end_time,
                occupied_minutes,
                granularity_minutes,
            ) {
                let candidate = day_start + Duration::minutes(candidate_min as i64);
                if candidate < now {
                    continue;
                }

                let candidate_end = candidate + Duration::minutes(occupied_minutes as i64);
                // Holds can lapse between the query and `now`; re-check
                // each row's blocking state against the same clock.
                let conflicted = busy.iter().any(|booking| {
                    if !booking.is_blocking(now) {
                        return false;
                    }
                    let (busy_start, busy_end) = occupied_range(booking);
                    ranges_overlap(candidate, candidate_end, busy_start, busy_end)
                });
                if conflicted {
                    continue;
                }

                slots.push(format!("{:02}:{:02}", candidate_min / 60, candidate_min % 60));
            }
        }

        Ok(slots)
    }

    async fn resolve_slot_terms(
        &self,
        consultant_id: Uuid,
        bookable: Option<Bookable>,
        requested_duration: Option<i32>,
    ) -> Result<BookingTerms, ServiceError> {
        let consultant = self
            .db_client
            .get_consultant(consultant_id)
            .await?
            .ok_or(ServiceError::ConsultantNotFound(consultant_id))?;

        match bookable {
            Some(Bookable::ConsultantService(service_id)) => {
                let service = self
                    .db_client
                    .get_consultant_service(service_id)
                    .await?
                    .filter(|s| s.consultant_id == consultant_id)
                    .ok_or(ServiceError::InvalidBookable)?;
                resolve_terms(&consultant, Some(&service), None, None)
            }
            // Slot enumeration only needs duration and buffer, so a method
            // is not required for direct-consultant queries.
            Some(Bookable::Consultant(_)) | None => Ok(BookingTerms {
                duration_minutes: requested_duration.ok_or(ServiceError::Validation(
                    "duration_minutes is required when no service is selected".to_string(),
                ))?,
                buffer_after_minutes: consultant.buffer_after_minutes.unwrap_or(0),
                price: 0.0,
                method: consultant
                    .default_method
                    .unwrap_or(crate::models::consultantmodel::ConsultationMethod::Video),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_ranges_overlap_half_open() {
        // Touching endpoints do not overlap.
        assert!(!ranges_overlap(0, 10, 10, 20));
        assert!(!ranges_overlap(10, 20, 0, 10));
        assert!(ranges_overlap(0, 11, 10, 20));
        assert!(ranges_overlap(12, 14, 10, 20));
        assert!(ranges_overlap(5, 25, 10, 20));
    }

    #[test]
    fn test_fits_in_any_interval() {
        let intervals = [(t(9, 0), t(12, 0)), (t(14, 0), t(17, 0))];

        assert!(fits_in_any_interval(&intervals, 9 * 60, 10 * 60));
        assert!(fits_in_any_interval(&intervals, 14 * 60, 17 * 60));
        // Straddles the lunch gap.
        assert!(!fits_in_any_interval(&intervals, 11 * 60, 15 * 60));
        // Runs past the last interval's end.
        assert!(!fits_in_any_interval(&intervals, 16 * 60, 17 * 60 + 30));
        // Containment must hold within a single interval.
        assert!(!fits_in_any_interval(&intervals, 8 * 60, 10 * 60));
    }

    #[test]
    fn test_slide_candidates_respects_occupation() {
        // 09:00-11:00, 60m + 15m buffer, 30m steps: only 09:00 and 09:30
        // leave room for the full 75 minutes; 09:45 is off-step.
        let candidates = slide_candidates(t(9, 0), t(11, 0), 75, 30);
        assert_eq!(candidates, vec![9 * 60, 9 * 60 + 30]);
    }

    #[test]
    fn test_slide_candidates_exact_fit() {
        let candidates = slide_candidates(t(9, 0), t(10, 0), 60, 30);
        assert_eq!(candidates, vec![9 * 60]);
    }

    #[test]
    fn test_slide_candidates_too_small_interval() {
        assert!(slide_candidates(t(9, 0), t(9, 30), 60, 30).is_empty());
    }

    #[test]
    fn test_slide_candidates_granularity_spacing() {
        let candidates = slide_candidates(t(9, 0), t(12, 0), 60, 45);
        assert_eq!(candidates, vec![9 * 60, 9 * 60 + 45, 10 * 60 + 30, 11 * 60]);
    }

    // §8-style worked example: Mon 09:00-17:00, 15m buffer. Booking A at
    // 10:00 for 60m occupies 10:00-11:15; a 10:30 request collides, an
    // 11:15 request does not.
    #[test]
    fn test_buffered_booking_blocks_overlap_but_not_adjacency() {
        let monday = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();

        let a_start = monday + Duration::minutes(10 * 60);
        let a_occupied_end = a_start + Duration::minutes(60 + 15);

        let b_start = monday + Duration::minutes(10 * 60 + 30);
        let b_end = b_start + Duration::minutes(60 + 15);
        assert!(ranges_overlap(b_start, b_end, a_start, a_occupied_end));

        let c_start = monday + Duration::minutes(11 * 60 + 15);
        let c_end = c_start + Duration::minutes(60 + 15);
        assert!(!ranges_overlap(c_start, c_end, a_start, a_occupied_end));

        // And both candidates fit the 09:00-17:00 working window.
        let intervals = [(t(9, 0), t(17, 0))];
        assert!(fits_in_any_interval(&intervals, 10 * 60 + 30, 11 * 60 + 45));
        assert!(fits_in_any_interval(&intervals, 11 * 60 + 15, 12 * 60 + 30));
    }
}
