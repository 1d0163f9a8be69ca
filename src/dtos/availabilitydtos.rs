use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::bookingmodel::BookableType;

#[derive(Debug, Deserialize)]
pub struct AvailableSlotsQuery {
    pub consultant_id: Uuid,
    pub date: NaiveDate,
    pub bookable_type: Option<BookableType>,
    pub bookable_id: Option<Uuid>,
    /// Required when no service is selected.
    pub duration_minutes: Option<i32>,
    pub granularity_minutes: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ValidateSlotDto {
    pub consultant_id: Uuid,
    pub start_at: DateTime<Utc>,

    #[validate(range(min = 5, max = 480, message = "Duration must be between 5 and 480 minutes"))]
    pub duration_minutes: i32,

    #[validate(range(min = 0, max = 240, message = "Buffer must be between 0 and 240 minutes"))]
    pub buffer_after_minutes: Option<i32>,

    pub exclude_booking_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct AvailableSlotsResponseDto {
    pub date: NaiveDate,
    pub slots: Vec<String>,
}
