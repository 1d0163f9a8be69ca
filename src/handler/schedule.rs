use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::consultantdb::ConsultantExt,
    dtos::scheduledtos::*,
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn schedule_handler() -> Router {
    Router::new()
        .route(
            "/working-hours",
            get(get_my_working_hours).put(replace_working_hours),
        )
        .route("/holidays", get(get_my_holidays).put(replace_holidays))
        .route("/:consultant_id/working-hours", get(get_working_hours))
        .route("/:consultant_id/holidays", get(get_holidays))
}

async fn own_consultant_id(
    app_state: &AppState,
    auth: &JWTAuthMiddeware,
) -> Result<Uuid, HttpError> {
    app_state
        .db_client
        .get_consultant_by_user(auth.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .map(|c| c.id)
        .ok_or_else(|| HttpError::forbidden("Only consultants can manage a schedule"))
}

pub async fn get_my_working_hours(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let consultant_id = own_consultant_id(&app_state, &auth).await?;
    let hours = app_state
        .schedule_service
        .get_working_hours(consultant_id)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": hours
    })))
}

pub async fn replace_working_hours(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<ReplaceWorkingHoursDto>,
) -> Result<impl IntoResponse, HttpError> {
    for hour in &body.hours {
        hour.validate()
            .map_err(|e| HttpError::bad_request(e.to_string()))?;
    }

    let consultant_id = own_consultant_id(&app_state, &auth).await?;
    let hours = app_state
        .schedule_service
        .replace_working_hours(consultant_id, &body.hours)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": hours
    })))
}

pub async fn get_my_holidays(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let consultant_id = own_consultant_id(&app_state, &auth).await?;
    let holidays = app_state.schedule_service.get_holidays(consultant_id).await?;

    Ok(Json(json!({
        "status": "success",
        "data": holidays
    })))
}

pub async fn replace_holidays(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<ReplaceHolidaysDto>,
) -> Result<impl IntoResponse, HttpError> {
    let consultant_id = own_consultant_id(&app_state, &auth).await?;
    let holidays = app_state
        .schedule_service
        .replace_holidays(consultant_id, &body.dates)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": holidays
    })))
}

pub async fn get_working_hours(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(consultant_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let hours = app_state
        .schedule_service
        .get_working_hours(consultant_id)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": hours
    })))
}

pub async fn get_holidays(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(consultant_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let holidays = app_state.schedule_service.get_holidays(consultant_id).await?;

    Ok(Json(json!({
        "status": "success",
        "data": holidays
    })))
}
