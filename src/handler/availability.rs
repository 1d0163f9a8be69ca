use std::sync::Arc;

use axum::{
    extract::Query,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

use crate::{
    db::consultantdb::ConsultantExt,
    dtos::availabilitydtos::*,
    error::HttpError,
    models::bookingmodel::Bookable,
    AppState,
};

pub const DEFAULT_GRANULARITY_MINUTES: i32 = 30;

pub fn availability_handler() -> Router {
    Router::new()
        .route("/slots", get(available_slots))
        .route("/validate", post(validate_slot))
}

pub async fn available_slots(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let bookable = match (query.bookable_type, query.bookable_id) {
        (Some(bookable_type), Some(bookable_id)) => {
            Some(Bookable::from_parts(bookable_type, bookable_id))
        }
        (None, None) => None,
        _ => {
            return Err(HttpError::bad_request(
                "bookable_type and bookable_id must be provided together",
            ))
        }
    };

    let granularity = query
        .granularity_minutes
        .unwrap_or(DEFAULT_GRANULARITY_MINUTES);
    if granularity <= 0 {
        return Err(HttpError::bad_request("Granularity must be positive"));
    }

    let slots = app_state
        .availability_service
        .available_slots(
            query.consultant_id,
            query.date,
            bookable,
            query.duration_minutes,
            granularity,
            Utc::now(),
        )
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": AvailableSlotsResponseDto {
            date: query.date,
            slots,
        }
    })))
}

pub async fn validate_slot(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<ValidateSlotDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    // Buffer defaults to the consultant's own setting when not supplied.
    let buffer = match body.buffer_after_minutes {
        Some(buffer) => buffer,
        None => app_state
            .db_client
            .get_consultant(body.consultant_id)
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?
            .ok_or_else(|| HttpError::not_found("Consultant not found"))?
            .buffer_after_minutes
            .unwrap_or(0),
    };

    let validation = app_state
        .availability_service
        .validate_slot(
            body.consultant_id,
            body.start_at,
            body.duration_minutes,
            buffer,
            body.exclude_booking_id,
        )
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": validation
    })))
}
