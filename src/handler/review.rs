use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{post, put},
    Extension, Json, Router,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::reviewdtos::*,
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn review_handler() -> Router {
    Router::new()
        .route("/", post(create_review))
        .route("/:review_id", put(update_review).delete(delete_review))
        .route("/:review_id/restore", put(restore_review))
}

pub async fn create_review(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateReviewDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let review = app_state
        .ratings_service
        .create_review(auth.user.id, &body)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": review
    })))
}

pub async fn update_review(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(review_id): Path<Uuid>,
    Json(body): Json<UpdateReviewDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let review = app_state
        .ratings_service
        .update_review(review_id, &auth.user, &body)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": review
    })))
}

pub async fn delete_review(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(review_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let review = app_state
        .ratings_service
        .delete_review(review_id, &auth.user)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": review
    })))
}

pub async fn restore_review(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(review_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let review = app_state
        .ratings_service
        .restore_review(review_id, &auth.user)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": review
    })))
}
