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
    dtos::chatdtos::*,
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn chat_handler() -> Router {
    Router::new()
        .route("/", post(get_or_create_conversation))
        .route(
            "/:conversation_id/messages",
            get(get_messages).post(send_message),
        )
        .route("/:conversation_id/read", put(mark_as_read))
        .route("/:conversation_id/unread-count", get(unread_count))
}

pub async fn get_or_create_conversation(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<GetOrCreateConversationDto>,
) -> Result<impl IntoResponse, HttpError> {
    let conversation = app_state
        .chat_service
        .get_or_create_conversation(body.booking_id, auth.user.id)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": conversation
    })))
}

pub async fn get_messages(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let page = app_state
        .read_state_service
        .get_messages_and_mark_read(conversation_id, auth.user.id, query.limit, query.before_id)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": page
    })))
}

pub async fn send_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(conversation_id): Path<Uuid>,
    Json(body): Json<SendMessageDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    for attachment in &body.attachments {
        attachment
            .validate()
            .map_err(|e| HttpError::bad_request(e.to_string()))?;
    }

    let message = app_state
        .chat_service
        .send_message(conversation_id, auth.user.id, &body)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": message
    })))
}

pub async fn mark_as_read(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(conversation_id): Path<Uuid>,
    Json(body): Json<MarkReadDto>,
) -> Result<impl IntoResponse, HttpError> {
    let participant = app_state
        .read_state_service
        .mark_as_read(conversation_id, auth.user.id, body.message_id)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": participant
    })))
}

pub async fn unread_count(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let unread = app_state
        .read_state_service
        .unread_count(conversation_id, auth.user.id)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": { "unread_count": unread }
    })))
}
