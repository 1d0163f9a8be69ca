// config.rs
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    // Booking tunables
    pub booking_hold_minutes: i64,
    pub expiry_sweep_interval_secs: u64,
    // Chat tunables
    pub out_of_session_message_cap: i64,
    pub max_attachments_per_message: usize,
    pub max_attachment_bytes: i64,
    // Mail service configuration
    pub smtp_host: String,
    pub smtp_username: String,
    pub smtp_password: String,
    pub mail_from: String,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");

        let booking_hold_minutes = std::env::var("BOOKING_HOLD_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);
        let expiry_sweep_interval_secs = std::env::var("EXPIRY_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);
        let out_of_session_message_cap = std::env::var("OUT_OF_SESSION_MESSAGE_CAP")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);
        let max_attachments_per_message = std::env::var("MAX_ATTACHMENTS_PER_MESSAGE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);
        let max_attachment_bytes = std::env::var("MAX_ATTACHMENT_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10 * 1024 * 1024);

        let smtp_host = std::env::var("SMTP_HOST")
            .unwrap_or_else(|_| "localhost".to_string());
        let smtp_username = std::env::var("SMTP_USERNAME")
            .unwrap_or_else(|_| "".to_string());
        let smtp_password = std::env::var("SMTP_PASSWORD")
            .unwrap_or_else(|_| "".to_string());
        let mail_from = std::env::var("MAIL_FROM")
            .unwrap_or_else(|_| "no-reply@consultly.app".to_string());

        Config {
            database_url,
            jwt_secret,
            port: 8000,
            booking_hold_minutes,
            expiry_sweep_interval_secs,
            out_of_session_message_cap,
            max_attachments_per_message,
            max_attachment_bytes,
            smtp_host,
            smtp_username,
            smtp_password,
            mail_from,
        }
    }
}
