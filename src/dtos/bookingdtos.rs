use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    bookingmodel::{BookableType, Booking, BookingStatus},
    consultantmodel::ConsultationMethod,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingDto {
    pub consultant_id: Uuid,
    pub bookable_type: BookableType,
    pub bookable_id: Uuid,
    pub start_at: DateTime<Utc>,
    /// Required for direct-consultant bookings; ignored for service
    /// bookings (the service fixes the duration).
    #[validate(range(min = 5, max = 480, message = "Duration must be between 5 and 480 minutes"))]
    pub duration_minutes: Option<i32>,
    pub method: Option<ConsultationMethod>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminCreateBookingDto {
    pub client_id: Uuid,
    pub consultant_id: Uuid,
    pub bookable_type: BookableType,
    pub bookable_id: Uuid,
    pub start_at: DateTime<Utc>,
    #[validate(range(min = 5, max = 480, message = "Duration must be between 5 and 480 minutes"))]
    pub duration_minutes: Option<i32>,
    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    pub price: Option<f64>,
    pub method: Option<ConsultationMethod>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminUpdateBookingDto {
    pub start_at: Option<DateTime<Utc>>,
    /// Alternative to `duration_minutes`; when both are given they must
    /// describe the same window.
    pub end_at: Option<DateTime<Utc>>,
    #[validate(range(min = 5, max = 480, message = "Duration must be between 5 and 480 minutes"))]
    pub duration_minutes: Option<i32>,
    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    pub price: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CancelBookingDto {
    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BookingFilterQuery {
    pub consultant_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct BookingListResponseDto {
    pub bookings: Vec<Booking>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}
