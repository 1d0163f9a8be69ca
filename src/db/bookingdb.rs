// db/bookingdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Error, Postgres, Transaction};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::{
    bookingmodel::{BookableType, Booking, BookingStatus, CancellerType},
    consultantmodel::ConsultationMethod,
};

const BOOKING_COLUMNS: &str = r#"id, client_id, consultant_id, bookable_type, bookable_id,
    start_at, end_at, duration_minutes, buffer_after_minutes, status, expires_at, price,
    method, cancelled_at, cancelled_by_type, cancelled_by_id, cancel_reason,
    created_at, updated_at"#;

/// `status = confirmed OR (status = pending AND expires_at > now())` — the
/// only predicate that defines which bookings count against availability.
const BLOCKING_PREDICATE: &str = r#"(status = 'confirmed'::booking_status
    OR (status = 'pending'::booking_status AND expires_at > NOW()))"#;

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub client_id: Uuid,
    pub consultant_id: Uuid,
    pub bookable_type: BookableType,
    pub bookable_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub buffer_after_minutes: i32,
    pub status: BookingStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub price: f64,
    pub method: ConsultationMethod,
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub consultant_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait BookingExt {
    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, Error>;

    async fn get_booking_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
    ) -> Result<Option<Booking>, Error>;

    /// Blocking bookings whose `[start_at, occupied_end)` intersects
    /// `[from, until)`. Read-only variant used by availability queries.
    async fn find_blocking_overlaps(
        &self,
        consultant_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        exclude_booking_id: Option<Uuid>,
    ) -> Result<Vec<Booking>, Error>;

    /// Same query with `FOR UPDATE` on the matching rows. Locking the
    /// overlap candidates closes the window between the conflict check and
    /// the insert without requiring serializable isolation.
    async fn find_blocking_overlaps_with_lock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        consultant_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        exclude_booking_id: Option<Uuid>,
    ) -> Result<Vec<Booking>, Error>;

    /// All blocking bookings for a consultant whose occupation touches the
    /// given window, ordered by start. Used to enumerate free slots.
    async fn blocking_bookings_in_window(
        &self,
        consultant_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Booking>, Error>;

    async fn insert_booking(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        new_booking: &NewBooking,
    ) -> Result<Booking, Error>;

    async fn confirm_booking(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
    ) -> Result<Booking, Error>;

    async fn cancel_booking(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
        cancelled_by_type: CancellerType,
        cancelled_by_id: Uuid,
        reason: Option<String>,
    ) -> Result<Booking, Error>;

    async fn update_booking_slot(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        duration_minutes: i32,
        buffer_after_minutes: i32,
        price: f64,
    ) -> Result<Booking, Error>;

    /// Bulk-expires timed-out pending bookings; returns the number of rows
    /// transitioned. Confirmed, cancelled and already-expired rows are
    /// never touched.
    async fn expire_old_pending(&self) -> Result<u64, Error>;

    async fn get_bookings_filtered(
        &self,
        filter: &BookingFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Booking>, Error>;

    async fn count_bookings_filtered(&self, filter: &BookingFilter) -> Result<i64, Error>;
}

#[async_trait]
impl BookingExt for DBClient {
    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, Error> {
        sqlx::query_as::<_, Booking>(&format!(
            r#"SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"#
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_booking_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
    ) -> Result<Option<Booking>, Error> {
        sqlx::query_as::<_, Booking>(&format!(
            r#"SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE"#
        ))
        .bind(booking_id)
        .fetch_optional(&mut **tx)
        .await
    }

    async fn find_blocking_overlaps(
        &self,
        consultant_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        exclude_booking_id: Option<Uuid>,
    ) -> Result<Vec<Booking>, Error> {
        sqlx::query_as::<_, Booking>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE consultant_id = $1
              AND {BLOCKING_PREDICATE}
              AND start_at < $3
              AND (end_at + make_interval(mins => buffer_after_minutes)) > $2
              AND ($4::uuid IS NULL OR id != $4)
            ORDER BY start_at
            "#
        ))
        .bind(consultant_id)
        .bind(from)
        .bind(until)
        .bind(exclude_booking_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_blocking_overlaps_with_lock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        consultant_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        exclude_booking_id: Option<Uuid>,
    ) -> Result<Vec<Booking>, Error> {
        sqlx::query_as::<_, Booking>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE consultant_id = $1
              AND {BLOCKING_PREDICATE}
              AND start_at < $3
              AND (end_at + make_interval(mins => buffer_after_minutes)) > $2
              AND ($4::uuid IS NULL OR id != $4)
            ORDER BY start_at
            FOR UPDATE
            "#
        ))
        .bind(consultant_id)
        .bind(from)
        .bind(until)
        .bind(exclude_booking_id)
        .fetch_all(&mut **tx)
        .await
    }

    async fn blocking_bookings_in_window(
        &self,
        consultant_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Booking>, Error> {
        sqlx::query_as::<_, Booking>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE consultant_id = $1
              AND {BLOCKING_PREDICATE}
              AND start_at < $3
              AND (end_at + make_interval(mins => buffer_after_minutes)) > $2
            ORDER BY start_at
            "#
        ))
        .bind(consultant_id)
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await
    }

    async fn insert_booking(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        new_booking: &NewBooking,
    ) -> Result<Booking, Error> {
        sqlx::query_as::<_, Booking>(&format!(
            r#"
            INSERT INTO bookings (client_id, consultant_id, bookable_type, bookable_id,
                start_at, end_at, duration_minutes, buffer_after_minutes, status,
                expires_at, price, method)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(new_booking.client_id)
        .bind(new_booking.consultant_id)
        .bind(new_booking.bookable_type)
        .bind(new_booking.bookable_id)
        .bind(new_booking.start_at)
        .bind(new_booking.end_at)
        .bind(new_booking.duration_minutes)
        .bind(new_booking.buffer_after_minutes)
        .bind(new_booking.status)
        .bind(new_booking.expires_at)
        .bind(new_booking.price)
        .bind(new_booking.method)
        .fetch_one(&mut **tx)
        .await
    }

    async fn confirm_booking(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
    ) -> Result<Booking, Error> {
        sqlx::query_as::<_, Booking>(&format!(
            r#"
            UPDATE bookings
            SET status = 'confirmed'::booking_status, expires_at = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .fetch_one(&mut **tx)
        .await
    }

    async fn cancel_booking(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
        cancelled_by_type: CancellerType,
        cancelled_by_id: Uuid,
        reason: Option<String>,
    ) -> Result<Booking, Error> {
        sqlx::query_as::<_, Booking>(&format!(
            r#"
            UPDATE bookings
            SET status = 'cancelled'::booking_status,
                cancelled_at = NOW(),
                cancelled_by_type = $2,
                cancelled_by_id = $3,
                cancel_reason = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .bind(cancelled_by_type)
        .bind(cancelled_by_id)
        .bind(reason)
        .fetch_one(&mut **tx)
        .await
    }

    async fn update_booking_slot(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        duration_minutes: i32,
        buffer_after_minutes: i32,
        price: f64,
    ) -> Result<Booking, Error> {
        sqlx::query_as::<_, Booking>(&format!(
            r#"
            UPDATE bookings
            SET start_at = $2, end_at = $3, duration_minutes = $4,
                buffer_after_minutes = $5, price = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .bind(start_at)
        .bind(end_at)
        .bind(duration_minutes)
        .bind(buffer_after_minutes)
        .bind(price)
        .fetch_one(&mut **tx)
        .await
    }

    async fn expire_old_pending(&self) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'expired'::booking_status, updated_at = NOW()
            WHERE status = 'pending'::booking_status
              AND expires_at IS NOT NULL
              AND expires_at <= NOW()
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn get_bookings_filtered(
        &self,
        filter: &BookingFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Booking>, Error> {
        sqlx::query_as::<_, Booking>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE ($1::uuid IS NULL OR consultant_id = $1)
              AND ($2::uuid IS NULL OR client_id = $2)
              AND ($3::booking_status IS NULL OR status = $3)
              AND ($4::timestamptz IS NULL OR start_at >= $4)
              AND ($5::timestamptz IS NULL OR start_at < $5)
            ORDER BY start_at DESC
            LIMIT $6 OFFSET $7
            "#
        ))
        .bind(filter.consultant_id)
        .bind(filter.client_id)
        .bind(filter.status)
        .bind(filter.from)
        .bind(filter.until)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_bookings_filtered(&self, filter: &BookingFilter) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM bookings
            WHERE ($1::uuid IS NULL OR consultant_id = $1)
              AND ($2::uuid IS NULL OR client_id = $2)
              AND ($3::booking_status IS NULL OR status = $3)
              AND ($4::timestamptz IS NULL OR start_at >= $4)
              AND ($5::timestamptz IS NULL OR start_at < $5)
            "#,
        )
        .bind(filter.consultant_id)
        .bind(filter.client_id)
        .bind(filter.status)
        .bind(filter.from)
        .bind(filter.until)
        .fetch_one(&self.pool)
        .await
    }
}
