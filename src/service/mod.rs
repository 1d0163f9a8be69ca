pub mod availability_service;
pub mod background_jobs;
pub mod booking_service;
pub mod chat_service;
pub mod error;
pub mod ratings_service;
pub mod read_state;
pub mod schedule_service;
pub mod terms;
