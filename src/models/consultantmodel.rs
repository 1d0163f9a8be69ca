use chrono::prelude::*;
use chrono::NaiveDate;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "consultation_method", rename_all = "snake_case")]
pub enum ConsultationMethod {
    Video,
    Phone,
    InPerson,
}

impl ConsultationMethod {
    pub fn to_str(&self) -> &'static str {
        match self {
            ConsultationMethod::Video => "video",
            ConsultationMethod::Phone => "phone",
            ConsultationMethod::InPerson => "in_person",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Consultant {
    pub id: Uuid,
    pub user_id: Uuid,
    pub headline: Option<String>,
    pub hourly_rate: f64,
    pub buffer_after_minutes: Option<i32>,
    pub default_method: Option<ConsultationMethod>,
    /// Denormalized cache, maintained only by the ratings service.
    pub rating_avg: f64,
    pub ratings_count: i32,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct ConsultantService {
    pub id: Uuid,
    pub consultant_id: Uuid,
    pub title: String,
    pub price: f64,
    pub duration_minutes: i32,
    pub buffer_after_minutes: Option<i32>,
    pub method: ConsultationMethod,
    pub rating_avg: f64,
    pub ratings_count: i32,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct WorkingHour {
    pub id: Uuid,
    pub consultant_id: Uuid,
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Holiday {
    pub id: Uuid,
    pub consultant_id: Uuid,
    pub holiday_date: NaiveDate,
    pub created_at: Option<DateTime<Utc>>,
}
