use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Review {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub consultant_id: Uuid,
    pub client_id: Uuid,
    pub consultant_service_id: Option<Uuid>,
    pub rating: i32,
    pub comment: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Result of the single aggregate query the ratings service runs over the
/// non-deleted review set.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct RatingSummary {
    pub rating_avg: f64,
    pub ratings_count: i64,
}
