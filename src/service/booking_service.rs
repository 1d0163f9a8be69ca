// service/booking_service.rs
//
// Transactional booking workflow. Correctness under concurrency rests on
// a two-lock protocol inside a single transaction:
//
//   1. lock the consultant row (`FOR UPDATE`) before anything else, which
//      serializes every booking attempt for that consultant;
//   2. run the conflict query with `FOR UPDATE` on the matching booking
//      rows, closing the phantom window between check and insert.
//
// Lock order is fixed (consultant before bookings) so concurrent
// transactions cannot deadlock on each other.

use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use uuid::Uuid;

use crate::{
    db::{
        bookingdb::{BookingExt, BookingFilter, NewBooking},
        consultantdb::ConsultantExt,
        db::DBClient,
        userdb::UserExt,
    },
    dtos::bookingdtos::{
        AdminCreateBookingDto, AdminUpdateBookingDto, BookingFilterQuery, CreateBookingDto,
    },
    mail::{mails, sendmail::Mailer},
    models::{
        bookingmodel::{Bookable, Booking, BookingStatus, CancellerType},
        consultantmodel::{Consultant, ConsultantService},
        usermodel::{User, UserRole},
    },
    service::{
        availability_service::AvailabilityService,
        error::ServiceError,
        terms::{resolve_terms, BookingTerms},
    },
    utils::money,
};

/// Hard input-format rule: booking start minutes and durations move in
/// 5-minute steps.
pub const SLOT_GRANULARITY_MINUTES: u32 = 5;

pub fn validate_granularity(
    start_at: DateTime<Utc>,
    duration_minutes: i32,
) -> Result<(), ServiceError> {
    if start_at.minute() % SLOT_GRANULARITY_MINUTES != 0 || start_at.second() != 0 {
        return Err(ServiceError::InvalidGranularity(
            "Booking start time must fall on a 5-minute boundary",
        ));
    }
    if duration_minutes <= 0 || duration_minutes % SLOT_GRANULARITY_MINUTES as i32 != 0 {
        return Err(ServiceError::InvalidGranularity(
            "Booking duration must be a positive multiple of 5 minutes",
        ));
    }
    Ok(())
}

/// Gate for the confirm/accept transition: only a pending booking whose
/// hold has not lapsed may be confirmed. A pending booking without an
/// expiry is treated as already lapsed.
pub fn ensure_confirmable(booking: &Booking, now: DateTime<Utc>) -> Result<(), ServiceError> {
    if booking.status != BookingStatus::Pending {
        return Err(ServiceError::InvalidBookingStatus(
            booking.id,
            booking.status.to_str(),
        ));
    }
    if booking.expires_at.map(|e| e <= now).unwrap_or(true) {
        return Err(ServiceError::HoldExpired(booking.id));
    }
    Ok(())
}

/// Resolves the updated duration from the admin's override fields. An
/// explicit `end_at` and an explicit duration are redundant, so they are
/// accepted together only when they agree.
pub fn resolve_updated_duration(
    start_at: DateTime<Utc>,
    current_duration: i32,
    duration_minutes: Option<i32>,
    end_at: Option<DateTime<Utc>>,
) -> Result<i32, ServiceError> {
    let from_end = match end_at {
        Some(end_at) => {
            let span = end_at.signed_duration_since(start_at);
            if span <= Duration::zero() || span.num_seconds() % 60 != 0 {
                return Err(ServiceError::Validation(
                    "end_at must be a whole number of minutes after start_at".to_string(),
                ));
            }
            Some(span.num_minutes() as i32)
        }
        None => None,
    };

    match (duration_minutes, from_end) {
        (Some(duration), Some(derived)) if duration != derived => Err(ServiceError::Validation(
            "duration_minutes and end_at disagree".to_string(),
        )),
        (_, Some(derived)) => Ok(derived),
        (Some(duration), None) => Ok(duration),
        (None, None) => Ok(current_duration),
    }
}

#[derive(Debug, Clone)]
pub struct BookingService {
    db_client: Arc<DBClient>,
    availability: AvailabilityService,
    mailer: Arc<Mailer>,
    hold_minutes: i64,
}

impl BookingService {
    pub fn new(
        db_client: Arc<DBClient>,
        availability: AvailabilityService,
        mailer: Arc<Mailer>,
        hold_minutes: i64,
    ) -> Self {
        Self {
            db_client,
            availability,
            mailer,
            hold_minutes,
        }
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, ServiceError> {
        self.db_client
            .get_booking(booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(booking_id))
    }

    pub async fn list_bookings(
        &self,
        query: &BookingFilterQuery,
    ) -> Result<(Vec<Booking>, i64), ServiceError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(20).min(100) as i64;
        let offset = (page as i64 - 1) * limit;

        let filter = BookingFilter {
            consultant_id: query.consultant_id,
            client_id: query.client_id,
            status: query.status,
            from: query.from,
            until: query.until,
        };

        let bookings = self
            .db_client
            .get_bookings_filtered(&filter, limit, offset)
            .await?;
        let total = self.db_client.count_bookings_filtered(&filter).await?;
        Ok((bookings, total))
    }

    /// Creates a pending booking holding the slot for `hold_minutes`.
    pub async fn create_pending(
        &self,
        client_id: Uuid,
        dto: &CreateBookingDto,
    ) -> Result<Booking, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;

        // Single serialization point for this consultant's calendar.
        let consultant = self
            .db_client
            .lock_consultant(&mut tx, dto.consultant_id)
            .await?
            .ok_or(ServiceError::ConsultantNotFound(dto.consultant_id))?;

        let bookable = Bookable::from_parts(dto.bookable_type, dto.bookable_id);
        let service = self.load_service_for(&consultant, &bookable).await?;
        let terms = resolve_terms(&consultant, service.as_ref(), dto.duration_minutes, dto.method)?;

        validate_granularity(dto.start_at, terms.duration_minutes)?;

        let (end_at, occupied_end) =
            self.check_schedule(&consultant, dto.start_at, &terms).await?;

        let overlaps = self
            .db_client
            .find_blocking_overlaps_with_lock(
                &mut tx,
                consultant.id,
                dto.start_at,
                occupied_end,
                None,
            )
            .await?;
        if !overlaps.is_empty() {
            return Err(ServiceError::SlotUnavailable);
        }

        let now = Utc::now();
        let booking = self
            .db_client
            .insert_booking(
                &mut tx,
                &NewBooking {
                    client_id,
                    consultant_id: consultant.id,
                    bookable_type: bookable.type_tag(),
                    bookable_id: bookable.id(),
                    start_at: dto.start_at,
                    end_at,
                    duration_minutes: terms.duration_minutes,
                    buffer_after_minutes: terms.buffer_after_minutes,
                    status: BookingStatus::Pending,
                    expires_at: Some(now + Duration::minutes(self.hold_minutes)),
                    price: terms.price,
                    method: terms.method,
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Booking {} created pending for consultant {} at {}",
            booking.id,
            booking.consultant_id,
            booking.start_at
        );
        Ok(booking)
    }

    /// Client-side confirmation of a pending hold.
    pub async fn confirm(&self, booking_id: Uuid, client_id: Uuid) -> Result<Booking, ServiceError> {
        self.confirm_internal(booking_id, |booking| {
            if booking.client_id != client_id {
                Err(ServiceError::NotBookingOwner(client_id, booking.id))
            } else {
                Ok(())
            }
        })
        .await
    }

    /// Consultant-side acceptance; the caller is the consultant's user.
    pub async fn accept_by_consultant(
        &self,
        booking_id: Uuid,
        consultant_user_id: Uuid,
    ) -> Result<Booking, ServiceError> {
        let consultant = self
            .db_client
            .get_consultant_by_user(consultant_user_id)
            .await?
            .ok_or(ServiceError::NotBookingOwner(consultant_user_id, booking_id))?;

        self.confirm_internal(booking_id, |booking| {
            if booking.consultant_id != consultant.id {
                Err(ServiceError::NotBookingOwner(consultant_user_id, booking.id))
            } else {
                Ok(())
            }
        })
        .await
    }

    async fn confirm_internal(
        &self,
        booking_id: Uuid,
        check_owner: impl Fn(&Booking) -> Result<(), ServiceError>,
    ) -> Result<Booking, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;

        // Plain read, only to learn the consultant. The lock order is
        // fixed crate-wide (consultant row before booking rows), so the
        // consultant lock must come before any `FOR UPDATE` on bookings.
        let booking = self
            .db_client
            .get_booking(booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(booking_id))?;
        check_owner(&booking)?;

        self.db_client
            .lock_consultant(&mut tx, booking.consultant_id)
            .await?
            .ok_or(ServiceError::ConsultantNotFound(booking.consultant_id))?;

        // Re-read under lock; status and expiry may have moved while we
        // waited for the consultant lock.
        let booking = self
            .db_client
            .get_booking_for_update(&mut tx, booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(booking_id))?;
        check_owner(&booking)?;
        ensure_confirmable(&booking, Utc::now())?;

        // Pending bookings already block each other, so a conflict here
        // means clock skew around expires_at let an overlapping hold
        // confirm first.
        let overlaps = self
            .db_client
            .find_blocking_overlaps_with_lock(
                &mut tx,
                booking.consultant_id,
                booking.start_at,
                booking.occupied_end(),
                Some(booking.id),
            )
            .await?;
        if !overlaps.is_empty() {
            return Err(ServiceError::SlotUnavailable);
        }

        let confirmed = self.db_client.confirm_booking(&mut tx, booking.id).await?;
        tx.commit().await?;

        tracing::info!("Booking {} confirmed", confirmed.id);
        self.notify_confirmed(&confirmed).await;
        Ok(confirmed)
    }

    /// Cancellation from pending or confirmed; records who cancelled.
    pub async fn cancel(
        &self,
        booking_id: Uuid,
        actor: &User,
        reason: Option<String>,
    ) -> Result<Booking, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;

        let booking = self
            .db_client
            .get_booking_for_update(&mut tx, booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(booking_id))?;

        let canceller_type = match actor.role {
            UserRole::Admin => CancellerType::Admin,
            _ => {
                self.ensure_party(&booking, actor.id).await?;
                CancellerType::User
            }
        };

        if !matches!(
            booking.status,
            BookingStatus::Pending | BookingStatus::Confirmed
        ) {
            return Err(ServiceError::InvalidBookingStatus(
                booking.id,
                booking.status.to_str(),
            ));
        }

        let cancelled = self
            .db_client
            .cancel_booking(&mut tx, booking.id, canceller_type, actor.id, reason.clone())
            .await?;
        tx.commit().await?;

        tracing::info!("Booking {} cancelled by {}", cancelled.id, actor.id);
        self.notify_cancelled(&cancelled, actor.id, reason.as_deref())
            .await;
        Ok(cancelled)
    }

    /// Admin creation: same lock-then-validate-then-write protocol, but the
    /// booking is written confirmed and price/duration may be overridden.
    pub async fn admin_create(&self, dto: &AdminCreateBookingDto) -> Result<Booking, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;

        let consultant = self
            .db_client
            .lock_consultant(&mut tx, dto.consultant_id)
            .await?
            .ok_or(ServiceError::ConsultantNotFound(dto.consultant_id))?;

        let bookable = Bookable::from_parts(dto.bookable_type, dto.bookable_id);
        let service = self.load_service_for(&consultant, &bookable).await?;
        let mut terms = resolve_terms(&consultant, service.as_ref(), dto.duration_minutes, dto.method)?;
        if let Some(duration) = dto.duration_minutes {
            terms.duration_minutes = duration;
            if service.is_none() {
                terms.price = money::hourly_price(consultant.hourly_rate, duration);
            }
        }
        if let Some(price) = dto.price {
            terms.price = money::round2(price);
        }

        validate_granularity(dto.start_at, terms.duration_minutes)?;
        let (end_at, occupied_end) =
            self.check_schedule(&consultant, dto.start_at, &terms).await?;

        let overlaps = self
            .db_client
            .find_blocking_overlaps_with_lock(
                &mut tx,
                consultant.id,
                dto.start_at,
                occupied_end,
                None,
            )
            .await?;
        if !overlaps.is_empty() {
            return Err(ServiceError::SlotUnavailable);
        }

        let booking = self
            .db_client
            .insert_booking(
                &mut tx,
                &NewBooking {
                    client_id: dto.client_id,
                    consultant_id: consultant.id,
                    bookable_type: bookable.type_tag(),
                    bookable_id: bookable.id(),
                    start_at: dto.start_at,
                    end_at,
                    duration_minutes: terms.duration_minutes,
                    buffer_after_minutes: terms.buffer_after_minutes,
                    status: BookingStatus::Confirmed,
                    expires_at: None,
                    price: terms.price,
                    method: terms.method,
                },
            )
            .await?;

        tx.commit().await?;
        tracing::info!("Booking {} created by admin", booking.id);
        Ok(booking)
    }

    /// Admin reschedule/edit; revalidates the slot with the same protocol,
    /// excluding the booking itself from the conflict check.
    pub async fn admin_update(
        &self,
        booking_id: Uuid,
        dto: &AdminUpdateBookingDto,
    ) -> Result<Booking, ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;

        // Same fixed lock order as create_pending: consultant row first,
        // booking rows after.
        let booking = self
            .db_client
            .get_booking(booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(booking_id))?;

        let consultant = self
            .db_client
            .lock_consultant(&mut tx, booking.consultant_id)
            .await?
            .ok_or(ServiceError::ConsultantNotFound(booking.consultant_id))?;

        let booking = self
            .db_client
            .get_booking_for_update(&mut tx, booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(booking_id))?;

        if booking.status.is_terminal() {
            return Err(ServiceError::InvalidBookingStatus(
                booking.id,
                booking.status.to_str(),
            ));
        }

        let start_at = dto.start_at.unwrap_or(booking.start_at);
        let duration_minutes = resolve_updated_duration(
            start_at,
            booking.duration_minutes,
            dto.duration_minutes,
            dto.end_at,
        )?;
        let price = dto.price.map(money::round2).unwrap_or(booking.price);

        validate_granularity(start_at, duration_minutes)?;

        let terms = BookingTerms {
            duration_minutes,
            // The buffer stays as snapshotted at creation.
            buffer_after_minutes: booking.buffer_after_minutes,
            price,
            method: booking.method,
        };
        let (end_at, occupied_end) = self.check_schedule(&consultant, start_at, &terms).await?;

        let overlaps = self
            .db_client
            .find_blocking_overlaps_with_lock(
                &mut tx,
                consultant.id,
                start_at,
                occupied_end,
                Some(booking.id),
            )
            .await?;
        if !overlaps.is_empty() {
            return Err(ServiceError::SlotUnavailable);
        }

        let updated = self
            .db_client
            .update_booking_slot(
                &mut tx,
                booking.id,
                start_at,
                end_at,
                duration_minutes,
                booking.buffer_after_minutes,
                price,
            )
            .await?;

        tx.commit().await?;
        tracing::info!("Booking {} updated by admin", updated.id);
        Ok(updated)
    }

    /// Background sweep: pending holds past their expiry become expired.
    pub async fn expire_old_pending(&self) -> Result<u64, ServiceError> {
        let expired = self.db_client.expire_old_pending().await?;
        if expired > 0 {
            tracing::info!("Expired {} timed-out pending bookings", expired);
        }
        Ok(expired)
    }

    /// Holiday and working-hours checks shared by every write path. These
    /// read only schedule data, not other bookings, so they need no lock.
    async fn check_schedule(
        &self,
        consultant: &Consultant,
        start_at: DateTime<Utc>,
        terms: &BookingTerms,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), ServiceError> {
        let end_at = start_at + Duration::minutes(terms.duration_minutes as i64);
        let occupied_end = end_at + Duration::minutes(terms.buffer_after_minutes as i64);

        if self
            .availability
            .is_holiday(consultant.id, start_at.date_naive())
            .await?
        {
            return Err(ServiceError::HolidayConflict);
        }

        if !self
            .availability
            .fits_in_working_hours(consultant.id, start_at, occupied_end)
            .await?
        {
            return Err(ServiceError::OutsideWorkingHours);
        }

        Ok((end_at, occupied_end))
    }

    async fn load_service_for(
        &self,
        consultant: &Consultant,
        bookable: &Bookable,
    ) -> Result<Option<ConsultantService>, ServiceError> {
        match bookable {
            Bookable::Consultant(id) => {
                if *id != consultant.id {
                    return Err(ServiceError::InvalidBookable);
                }
                Ok(None)
            }
            Bookable::ConsultantService(service_id) => {
                let service = self
                    .db_client
                    .get_consultant_service(*service_id)
                    .await?
                    .filter(|s| s.consultant_id == consultant.id)
                    .ok_or(ServiceError::InvalidBookable)?;
                Ok(Some(service))
            }
        }
    }

    /// Callers may act on a booking as its client or as the consultant's
    /// user; anybody else is rejected.
    async fn ensure_party(&self, booking: &Booking, user_id: Uuid) -> Result<(), ServiceError> {
        if booking.client_id == user_id {
            return Ok(());
        }
        let consultant = self
            .db_client
            .get_consultant(booking.consultant_id)
            .await?
            .ok_or(ServiceError::ConsultantNotFound(booking.consultant_id))?;
        if consultant.user_id == user_id {
            return Ok(());
        }
        Err(ServiceError::NotBookingOwner(user_id, booking.id))
    }

    async fn notify_confirmed(&self, booking: &Booking) {
        if let Ok(Some(client)) = self.db_client.get_user(booking.client_id).await {
            mails::send_booking_confirmed_email(
                &self.mailer,
                &client.email,
                &client.name,
                booking.start_at,
            )
            .await;
        }
    }

    async fn notify_cancelled(&self, booking: &Booking, cancelled_by: Uuid, reason: Option<&str>) {
        // Notify the party that did not cancel.
        let recipient_id = if booking.client_id == cancelled_by {
            match self.db_client.get_consultant(booking.consultant_id).await {
                Ok(Some(consultant)) => consultant.user_id,
                _ => return,
            }
        } else {
            booking.client_id
        };

        if let Ok(Some(user)) = self.db_client.get_user(recipient_id).await {
            mails::send_booking_cancelled_email(
                &self.mailer,
                &user.email,
                &user.name,
                booking.start_at,
                reason,
            )
            .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, s).unwrap()
    }

    #[test]
    fn test_granularity_accepts_five_minute_steps() {
        for minute in (0..60).step_by(5) {
            assert!(validate_granularity(at(10, minute, 0), 60).is_ok());
        }
    }

    #[test]
    fn test_granularity_rejects_off_step_minutes() {
        assert!(validate_granularity(at(10, 3, 0), 60).is_err());
        assert!(validate_granularity(at(10, 59, 0), 60).is_err());
        assert!(validate_granularity(at(10, 0, 30), 60).is_err());
    }

    #[test]
    fn test_granularity_rejects_bad_durations() {
        assert!(validate_granularity(at(10, 0, 0), 0).is_err());
        assert!(validate_granularity(at(10, 0, 0), -5).is_err());
        assert!(validate_granularity(at(10, 0, 0), 62).is_err());
        assert!(validate_granularity(at(10, 0, 0), 45).is_ok());
    }

    fn pending_booking(expires_at: Option<DateTime<Utc>>) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            consultant_id: Uuid::new_v4(),
            bookable_type: crate::models::bookingmodel::BookableType::Consultant,
            bookable_id: Uuid::new_v4(),
            start_at: at(10, 0, 0),
            end_at: at(11, 0, 0),
            duration_minutes: 60,
            buffer_after_minutes: 0,
            status: BookingStatus::Pending,
            expires_at,
            price: 100.0,
            method: crate::models::consultantmodel::ConsultationMethod::Video,
            cancelled_at: None,
            cancelled_by_type: None,
            cancelled_by_id: None,
            cancel_reason: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_confirmable_only_while_hold_is_live() {
        let now = at(9, 0, 0);

        let live = pending_booking(Some(at(9, 30, 0)));
        assert!(ensure_confirmable(&live, now).is_ok());

        let lapsed = pending_booking(Some(at(8, 59, 0)));
        assert!(matches!(
            ensure_confirmable(&lapsed, now),
            Err(ServiceError::HoldExpired(_))
        ));

        // Exactly at the boundary the hold is gone.
        let boundary = pending_booking(Some(now));
        assert!(ensure_confirmable(&boundary, now).is_err());

        let no_expiry = pending_booking(None);
        assert!(matches!(
            ensure_confirmable(&no_expiry, now),
            Err(ServiceError::HoldExpired(_))
        ));
    }

    #[test]
    fn test_confirmable_rejects_non_pending_statuses() {
        let now = at(9, 0, 0);
        for status in [
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            BookingStatus::Completed,
            BookingStatus::Expired,
        ] {
            let mut booking = pending_booking(Some(at(9, 30, 0)));
            booking.status = status;
            assert!(matches!(
                ensure_confirmable(&booking, now),
                Err(ServiceError::InvalidBookingStatus(_, _))
            ));
        }
    }

    #[test]
    fn test_updated_duration_from_end_at() {
        let start = at(10, 0, 0);

        assert_eq!(
            resolve_updated_duration(start, 60, None, Some(at(11, 30, 0))).unwrap(),
            90
        );
        // Agreement is fine, disagreement is not.
        assert_eq!(
            resolve_updated_duration(start, 60, Some(90), Some(at(11, 30, 0))).unwrap(),
            90
        );
        assert!(resolve_updated_duration(start, 60, Some(60), Some(at(11, 30, 0))).is_err());
        // end_at before or at start_at is rejected.
        assert!(resolve_updated_duration(start, 60, None, Some(start)).is_err());
        assert!(resolve_updated_duration(start, 60, None, Some(at(9, 0, 0))).is_err());
        // Sub-minute ends are rejected.
        assert!(resolve_updated_duration(start, 60, None, Some(at(10, 30, 30))).is_err());
    }

    #[test]
    fn test_updated_duration_defaults_to_current() {
        let start = at(10, 0, 0);
        assert_eq!(resolve_updated_duration(start, 45, None, None).unwrap(), 45);
        assert_eq!(resolve_updated_duration(start, 45, Some(30), None).unwrap(), 30);
    }
}
