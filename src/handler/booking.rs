use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::consultantdb::ConsultantExt,
    dtos::bookingdtos::*,
    error::HttpError,
    middleware::JWTAuthMiddeware,
    models::usermodel::UserRole,
    AppState,
};

pub fn booking_handler() -> Router {
    Router::new()
        .route("/", post(create_booking).get(list_bookings))
        .route("/:booking_id", get(get_booking))
        .route("/:booking_id/confirm", put(confirm_booking))
        .route("/:booking_id/accept", put(accept_booking))
        .route("/:booking_id/cancel", put(cancel_booking))
}

pub fn admin_booking_handler() -> Router {
    Router::new()
        .route("/", post(admin_create_booking))
        .route("/:booking_id", put(admin_update_booking))
}

pub async fn create_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateBookingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let booking = app_state
        .booking_service
        .create_pending(auth.user.id, &body)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": booking
    })))
}

pub async fn get_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let booking = app_state.booking_service.get_booking(booking_id).await?;

    // Visibility mirrors the write-side ownership rules.
    let allowed = booking.client_id == auth.user.id
        || auth.user.role == UserRole::Admin
        || app_state
            .db_client
            .get_consultant_by_user(auth.user.id)
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?
            .map(|c| c.id == booking.consultant_id)
            .unwrap_or(false);
    if !allowed {
        return Err(HttpError::forbidden("Not allowed to view this booking"));
    }

    Ok(Json(json!({
        "status": "success",
        "data": booking
    })))
}

pub async fn list_bookings(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(mut query): Query<BookingFilterQuery>,
) -> Result<impl IntoResponse, HttpError> {
    // Non-admins only see their own side of the marketplace.
    if auth.user.role != UserRole::Admin {
        match app_state
            .db_client
            .get_consultant_by_user(auth.user.id)
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?
        {
            Some(consultant) => query.consultant_id = Some(consultant.id),
            None => query.client_id = Some(auth.user.id),
        }
    }

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).min(100);
    let (bookings, total) = app_state.booking_service.list_bookings(&query).await?;

    Ok(Json(json!({
        "status": "success",
        "data": BookingListResponseDto {
            bookings,
            total,
            page,
            limit,
        }
    })))
}

pub async fn confirm_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let booking = app_state
        .booking_service
        .confirm(booking_id, auth.user.id)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": booking
    })))
}

pub async fn accept_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let booking = app_state
        .booking_service
        .accept_by_consultant(booking_id, auth.user.id)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": booking
    })))
}

pub async fn cancel_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<CancelBookingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let booking = app_state
        .booking_service
        .cancel(booking_id, &auth.user, body.reason)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": booking
    })))
}

pub async fn admin_create_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<AdminCreateBookingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let booking = app_state.booking_service.admin_create(&body).await?;

    Ok(Json(json!({
        "status": "success",
        "data": booking
    })))
}

pub async fn admin_update_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<AdminUpdateBookingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let booking = app_state
        .booking_service
        .admin_update(booking_id, &body)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": booking
    })))
}
