// service/background_jobs.rs
use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration};

use crate::AppState;

/// Recurring sweep that lapses timed-out pending bookings to expired.
pub async fn start_booking_expiry_job(app_state: Arc<AppState>) {
    let mut interval = interval(Duration::from_secs(app_state.env.expiry_sweep_interval_secs));

    loop {
        interval.tick().await;

        match app_state.booking_service.expire_old_pending().await {
            Ok(0) => {}
            Ok(expired) => tracing::info!(
                "Booking expiry sweep at {}: {} holds lapsed",
                Utc::now(),
                expired
            ),
            Err(e) => tracing::error!("Booking expiry sweep failed: {}", e),
        }
    }
}
