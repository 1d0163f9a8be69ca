use chrono::prelude::*;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::consultantmodel::ConsultationMethod;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    Expired,
}

impl BookingStatus {
    pub fn to_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
            BookingStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Cancelled | BookingStatus::Completed | BookingStatus::Expired
        )
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "bookable_type", rename_all = "snake_case")]
pub enum BookableType {
    Consultant,
    ConsultantService,
}

impl BookableType {
    pub fn to_str(&self) -> &'static str {
        match self {
            BookableType::Consultant => "consultant",
            BookableType::ConsultantService => "consultant_service",
        }
    }
}

/// Polymorphic booking target, resolved through an explicit mapping
/// rather than a runtime lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bookable {
    Consultant(Uuid),
    ConsultantService(Uuid),
}

impl Bookable {
    pub fn from_parts(bookable_type: BookableType, bookable_id: Uuid) -> Self {
        match bookable_type {
            BookableType::Consultant => Bookable::Consultant(bookable_id),
            BookableType::ConsultantService => Bookable::ConsultantService(bookable_id),
        }
    }

    pub fn type_tag(&self) -> BookableType {
        match self {
            Bookable::Consultant(_) => BookableType::Consultant,
            Bookable::ConsultantService(_) => BookableType::ConsultantService,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Bookable::Consultant(id) | Bookable::ConsultantService(id) => *id,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "canceller_type", rename_all = "snake_case")]
pub enum CancellerType {
    User,
    Admin,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Booking {
    pub id: Uuid,
    pub client_id: Uuid,
    pub consultant_id: Uuid,
    pub bookable_type: BookableType,
    pub bookable_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub duration_minutes: i32,
    /// Snapshotted at creation; later buffer changes on the consultant or
    /// service do not reach back into existing bookings.
    pub buffer_after_minutes: i32,
    pub status: BookingStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub price: f64,
    pub method: ConsultationMethod,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by_type: Option<CancellerType>,
    pub cancelled_by_id: Option<Uuid>,
    pub cancel_reason: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// End of the booking's exclusive hold on the calendar: `end_at` plus
    /// the snapshotted buffer.
    pub fn occupied_end(&self) -> DateTime<Utc> {
        self.end_at + Duration::minutes(self.buffer_after_minutes as i64)
    }

    pub fn bookable(&self) -> Bookable {
        Bookable::from_parts(self.bookable_type, self.bookable_id)
    }

    /// Whether this booking currently counts against availability.
    pub fn is_blocking(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            BookingStatus::Confirmed => true,
            BookingStatus::Pending => self.expires_at.map(|e| e > now).unwrap_or(false),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn booking(status: BookingStatus, expires_at: Option<DateTime<Utc>>) -> Booking {
        let start = Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap();
        Booking {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            consultant_id: Uuid::new_v4(),
            bookable_type: BookableType::Consultant,
            bookable_id: Uuid::new_v4(),
            start_at: start,
            end_at: start + Duration::minutes(60),
            duration_minutes: 60,
            buffer_after_minutes: 15,
            status,
            expires_at,
            price: 100.0,
            method: ConsultationMethod::Video,
            cancelled_at: None,
            cancelled_by_type: None,
            cancelled_by_id: None,
            cancel_reason: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_blocking_states() {
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
        let later = now + Duration::minutes(30);
        let earlier = now - Duration::minutes(30);

        assert!(booking(BookingStatus::Confirmed, None).is_blocking(now));
        assert!(booking(BookingStatus::Pending, Some(later)).is_blocking(now));

        assert!(!booking(BookingStatus::Pending, Some(earlier)).is_blocking(now));
        assert!(!booking(BookingStatus::Pending, Some(now)).is_blocking(now));
        assert!(!booking(BookingStatus::Pending, None).is_blocking(now));
        assert!(!booking(BookingStatus::Cancelled, None).is_blocking(now));
        assert!(!booking(BookingStatus::Completed, None).is_blocking(now));
        assert!(!booking(BookingStatus::Expired, None).is_blocking(now));
    }

    #[test]
    fn test_occupied_end_includes_buffer() {
        let b = booking(BookingStatus::Confirmed, None);
        assert_eq!(b.occupied_end(), b.end_at + Duration::minutes(15));
    }
}
