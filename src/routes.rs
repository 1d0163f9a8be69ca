use std::sync::Arc;

use axum::{middleware, response::IntoResponse, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        availability::availability_handler,
        booking::{admin_booking_handler, booking_handler},
        chat::chat_handler,
        review::review_handler,
        schedule::schedule_handler,
    },
    middleware::{auth, require_admin},
    AppState,
};

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/bookings", booking_handler())
        .nest(
            "/admin/bookings",
            admin_booking_handler().layer(middleware::from_fn(require_admin)),
        )
        .nest("/availability", availability_handler())
        .nest("/schedule", schedule_handler())
        .nest("/conversations", chat_handler())
        .nest("/reviews", review_handler())
        .layer(middleware::from_fn(auth));

    Router::new()
        .nest("/api", api_route)
        .route("/healthchecker", get(health_checker))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state))
}

pub async fn health_checker() -> impl IntoResponse {
    const MESSAGE: &str = "Consultation booking API";

    Json(json!({
        "status": "success",
        "message": MESSAGE
    }))
}
