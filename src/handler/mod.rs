pub mod availability;
pub mod booking;
pub mod chat;
pub mod review;
pub mod schedule;
