use thiserror::Error;
use uuid::Uuid;

use crate::error::HttpError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("The selected date is a holiday for this consultant")]
    HolidayConflict,

    #[error("The requested slot falls outside the consultant's working hours")]
    OutsideWorkingHours,

    #[error("The requested slot is no longer available")]
    SlotUnavailable,

    #[error("{0}")]
    InvalidGranularity(&'static str),

    #[error("Invalid booking target")]
    InvalidBookable,

    #[error("Booking {0} not found")]
    BookingNotFound(Uuid),

    #[error("Consultant {0} not found")]
    ConsultantNotFound(Uuid),

    #[error("Conversation {0} not found")]
    ConversationNotFound(Uuid),

    #[error("Review {0} not found")]
    ReviewNotFound(Uuid),

    #[error("Booking {0} is in status {1}, which does not allow this transition")]
    InvalidBookingStatus(Uuid, &'static str),

    #[error("The hold on booking {0} has expired")]
    HoldExpired(Uuid),

    #[error("User {0} is not allowed to act on booking {1}")]
    NotBookingOwner(Uuid, Uuid),

    #[error("User {0} is not a participant of conversation {1}")]
    NotParticipant(Uuid, Uuid),

    #[error("Messaging is only available while the booking is confirmed")]
    MessagingClosed,

    #[error("Out-of-session message limit reached for this conversation")]
    MessageQuotaExceeded,

    #[error("A message needs a body, attachments, or both")]
    EmptyMessage,

    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),

    #[error("This booking already has a review")]
    DuplicateReview,

    #[error("Rating must be between 1 and 5")]
    RatingOutOfRange,

    #[error("Only completed bookings can be reviewed")]
    ReviewNotAllowed,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    /// Machine-readable reason code carried alongside the human message;
    /// callers branch on this, not on the display text.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::HolidayConflict => "holiday_conflict",
            ServiceError::OutsideWorkingHours => "outside_working_hours",
            ServiceError::SlotUnavailable => "slot_unavailable",
            ServiceError::InvalidGranularity(_) => "invalid_granularity",
            ServiceError::InvalidBookable => "invalid_bookable",
            ServiceError::BookingNotFound(_) => "booking_not_found",
            ServiceError::ConsultantNotFound(_) => "consultant_not_found",
            ServiceError::ConversationNotFound(_) => "conversation_not_found",
            ServiceError::ReviewNotFound(_) => "review_not_found",
            ServiceError::InvalidBookingStatus(_, _) => "invalid_status",
            ServiceError::HoldExpired(_) => "hold_expired",
            ServiceError::NotBookingOwner(_, _) => "not_booking_owner",
            ServiceError::NotParticipant(_, _) => "not_participant",
            ServiceError::MessagingClosed => "messaging_closed",
            ServiceError::MessageQuotaExceeded => "message_quota_exceeded",
            ServiceError::EmptyMessage => "empty_message",
            ServiceError::InvalidAttachment(_) => "invalid_attachment",
            ServiceError::DuplicateReview => "duplicate_review",
            ServiceError::RatingOutOfRange => "rating_out_of_range",
            ServiceError::ReviewNotAllowed => "review_not_allowed",
            ServiceError::Validation(_) => "validation",
            ServiceError::Database(_) => "database",
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::BookingNotFound(_)
            | ServiceError::ConsultantNotFound(_)
            | ServiceError::ConversationNotFound(_)
            | ServiceError::ReviewNotFound(_) => HttpError::not_found(error.to_string()),

            ServiceError::NotBookingOwner(_, _) | ServiceError::NotParticipant(_, _) => {
                HttpError::forbidden(error.to_string())
            }

            ServiceError::SlotUnavailable | ServiceError::DuplicateReview => {
                HttpError::conflict(error.to_string())
            }

            ServiceError::HolidayConflict
            | ServiceError::OutsideWorkingHours
            | ServiceError::InvalidGranularity(_)
            | ServiceError::InvalidBookable
            | ServiceError::InvalidBookingStatus(_, _)
            | ServiceError::HoldExpired(_)
            | ServiceError::MessagingClosed
            | ServiceError::MessageQuotaExceeded
            | ServiceError::EmptyMessage
            | ServiceError::InvalidAttachment(_)
            | ServiceError::RatingOutOfRange
            | ServiceError::ReviewNotAllowed
            | ServiceError::Validation(_) => HttpError::bad_request(error.to_string()),

            ServiceError::Database(_) => HttpError::server_error(error.to_string()),
        }
    }
}
