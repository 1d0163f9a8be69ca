mod models;
mod service;
mod config;
mod dtos;
mod error;
mod db;
mod utils;
mod middleware;
mod mail;
mod handler;
mod routes;

use std::sync::Arc;

use axum::http::{header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE}, HeaderValue, Method};
use config::Config;
use db::db::DBClient;
use dotenv::dotenv;
use mail::sendmail::Mailer;
use routes::create_router;
use service::{
    availability_service::AvailabilityService,
    background_jobs::start_booking_expiry_job,
    booking_service::BookingService,
    chat_service::ChatService,
    ratings_service::RatingsService,
    read_state::ReadStateService,
    schedule_service::ScheduleService,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    pub availability_service: AvailabilityService,
    pub booking_service: BookingService,
    pub chat_service: ChatService,
    pub read_state_service: ReadStateService,
    pub ratings_service: RatingsService,
    pub schedule_service: ScheduleService,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    dotenv().ok();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            println!("✅Connection to the database is successful!");
            pool
        }
        Err(err) => {
            println!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let allowed_origins = vec![
        "http://localhost:5173".parse::<HeaderValue>().unwrap(),
        "http://localhost:8000".parse::<HeaderValue>().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let db_client = Arc::new(DBClient::new(pool));
    let mailer = Arc::new(Mailer::new(&config));

    let availability_service = AvailabilityService::new(db_client.clone());
    let booking_service = BookingService::new(
        db_client.clone(),
        availability_service.clone(),
        mailer.clone(),
        config.booking_hold_minutes,
    );
    let chat_service = ChatService::new(
        db_client.clone(),
        config.out_of_session_message_cap,
        config.max_attachments_per_message,
        config.max_attachment_bytes,
    );
    let read_state_service = ReadStateService::new(db_client.clone());
    let ratings_service = RatingsService::new(db_client.clone());
    let schedule_service = ScheduleService::new(db_client.clone());

    let app_state = Arc::new(AppState {
        env: config.clone(),
        db_client,
        availability_service,
        booking_service,
        chat_service,
        read_state_service,
        ratings_service,
        schedule_service,
    });

    tokio::spawn(start_booking_expiry_job(app_state.clone()));

    let app = create_router(app_state).layer(cors.clone());

    println!(
        "{}",
        format!("🚀 Server is running on http://localhost:{}", config.port)
    );

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port))
        .await
        .unwrap();

    axum::serve(listener, app).await.unwrap();
}
