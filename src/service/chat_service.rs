// service/chat_service.rs
//
// Message-send workflow. All sends for one conversation are serialized by
// a `FOR UPDATE` lock on the conversation row; the client's out-of-session
// quota is counted under that lock, so two concurrent sends cannot both
// observe the same count.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    db::{
        bookingdb::BookingExt,
        chatdb::{ChatExt, NewAttachment},
        consultantdb::ConsultantExt,
        db::DBClient,
    },
    dtos::chatdtos::{AttachmentDto, MessageWithAttachments, SendMessageDto},
    models::{
        bookingmodel::{Booking, BookingStatus},
        chatmodels::{Conversation, MessageContext, MessageType},
    },
    service::error::ServiceError,
};

/// Attachments always land on the private disk.
pub const ATTACHMENT_DISK: &str = "private";

const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

/// Session window is `[start_at, start_at + duration)`; the buffer is a
/// scheduling gap, not consultation time.
pub fn is_in_session(start_at: DateTime<Utc>, duration_minutes: i32, now: DateTime<Utc>) -> bool {
    now >= start_at && now < start_at + Duration::minutes(duration_minutes as i64)
}

/// Message type is derived once from what the sender provided.
pub fn derive_message_type(
    body: Option<&str>,
    attachment_count: usize,
) -> Result<MessageType, ServiceError> {
    let has_body = body.map(|b| !b.trim().is_empty()).unwrap_or(false);
    match (has_body, attachment_count > 0) {
        (true, true) => Ok(MessageType::Mixed),
        (true, false) => Ok(MessageType::Text),
        (false, true) => Ok(MessageType::Attachment),
        (false, false) => Err(ServiceError::EmptyMessage),
    }
}

#[derive(Debug, Clone)]
pub struct ChatService {
    db_client: Arc<DBClient>,
    out_of_session_cap: i64,
    max_attachments: usize,
    max_attachment_bytes: i64,
}

impl ChatService {
    pub fn new(
        db_client: Arc<DBClient>,
        out_of_session_cap: i64,
        max_attachments: usize,
        max_attachment_bytes: i64,
    ) -> Self {
        Self {
            db_client,
            out_of_session_cap,
            max_attachments,
            max_attachment_bytes,
        }
    }

    /// Fails closed unless the caller is the booking's client or the
    /// consultant's user. Idempotent under concurrency: the uniqueness
    /// constraint on `booking_id` makes every caller converge on one row.
    pub async fn get_or_create_conversation(
        &self,
        booking_id: Uuid,
        user_id: Uuid,
    ) -> Result<Conversation, ServiceError> {
        let booking = self
            .db_client
            .get_booking(booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(booking_id))?;

        let consultant_user_id = self.consultant_user_id(&booking).await?;
        if user_id != booking.client_id && user_id != consultant_user_id {
            return Err(ServiceError::NotParticipant(user_id, booking_id));
        }

        let conversation = self
            .db_client
            .create_or_get_conversation(booking_id, [booking.client_id, consultant_user_id])
            .await?;
        Ok(conversation)
    }

    pub async fn send_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        dto: &SendMessageDto,
    ) -> Result<MessageWithAttachments, ServiceError> {
        let message_type = derive_message_type(dto.body.as_deref(), dto.attachments.len())?;
        self.validate_attachments(&dto.attachments)?;

        let mut tx = self.db_client.pool.begin().await?;

        // Serialization point for this conversation.
        let conversation = self
            .db_client
            .lock_conversation(&mut tx, conversation_id)
            .await?
            .ok_or(ServiceError::ConversationNotFound(conversation_id))?;

        let participant = self
            .db_client
            .get_participant(conversation_id, sender_id)
            .await?;
        if participant.is_none() {
            return Err(ServiceError::NotParticipant(sender_id, conversation_id));
        }

        let booking = self
            .db_client
            .get_booking(conversation.booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(conversation.booking_id))?;
        if booking.status != BookingStatus::Confirmed {
            return Err(ServiceError::MessagingClosed);
        }

        let now = Utc::now();
        let context = if is_in_session(booking.start_at, booking.duration_minutes, now) {
            MessageContext::InSession
        } else {
            MessageContext::OutOfSession
        };

        // The consultant's user is unlimited in both contexts; the client
        // gets a lifetime out-of-session allowance per conversation.
        if context == MessageContext::OutOfSession && sender_id == booking.client_id {
            let sent = self
                .db_client
                .count_out_of_session_messages(&mut tx, conversation_id, sender_id)
                .await?;
            if sent >= self.out_of_session_cap {
                return Err(ServiceError::MessageQuotaExceeded);
            }
        }

        let message = self
            .db_client
            .insert_message(
                &mut tx,
                conversation_id,
                sender_id,
                dto.body.clone().filter(|b| !b.trim().is_empty()),
                message_type,
                context,
            )
            .await?;

        let mut attachments = Vec::with_capacity(dto.attachments.len());
        for attachment in &dto.attachments {
            let saved = self
                .db_client
                .insert_attachment(
                    &mut tx,
                    message.id,
                    &NewAttachment {
                        original_name: attachment.original_name.clone(),
                        mime_type: attachment.mime_type.clone(),
                        size_bytes: attachment.size_bytes,
                        disk: ATTACHMENT_DISK.to_string(),
                        path: attachment.path.clone(),
                    },
                )
                .await?;
            attachments.push(saved);
        }

        tx.commit().await?;

        tracing::debug!(
            "Message {} sent in conversation {} ({:?})",
            message.id,
            conversation_id,
            context
        );
        Ok(MessageWithAttachments {
            message,
            attachments,
        })
    }

    /// One invalid file rejects the whole send; there are no partial
    /// messages.
    fn validate_attachments(&self, attachments: &[AttachmentDto]) -> Result<(), ServiceError> {
        if attachments.len() > self.max_attachments {
            return Err(ServiceError::InvalidAttachment(format!(
                "At most {} attachments per message",
                self.max_attachments
            )));
        }
        for attachment in attachments {
            if !ALLOWED_MIME_TYPES.contains(&attachment.mime_type.as_str()) {
                return Err(ServiceError::InvalidAttachment(format!(
                    "File type {} is not allowed",
                    attachment.mime_type
                )));
            }
            if attachment.size_bytes <= 0 || attachment.size_bytes > self.max_attachment_bytes {
                return Err(ServiceError::InvalidAttachment(format!(
                    "File {} exceeds the size limit",
                    attachment.original_name
                )));
            }
        }
        Ok(())
    }

    async fn consultant_user_id(&self, booking: &Booking) -> Result<Uuid, ServiceError> {
        let consultant = self
            .db_client
            .get_consultant(booking.consultant_id)
            .await?
            .ok_or(ServiceError::ConsultantNotFound(booking.consultant_id))?;
        Ok(consultant.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn chat_service() -> ChatService {
        let pool = sqlx::postgres::PgPool::connect_lazy("postgres://localhost/consultly").unwrap();
        ChatService::new(Arc::new(DBClient::new(pool)), 2, 5, 10 * 1024 * 1024)
    }

    fn attachment(mime: &str, size: i64) -> AttachmentDto {
        AttachmentDto {
            original_name: "notes.pdf".to_string(),
            mime_type: mime.to_string(),
            size_bytes: size,
            path: "chat/abc/notes.pdf".to_string(),
        }
    }

    #[test]
    fn test_session_window_excludes_buffer() {
        let start = Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap();

        assert!(!is_in_session(start, 60, start - Duration::minutes(1)));
        assert!(is_in_session(start, 60, start));
        assert!(is_in_session(start, 60, start + Duration::minutes(59)));
        // The end boundary is exclusive; buffer time is not session time.
        assert!(!is_in_session(start, 60, start + Duration::minutes(60)));
        assert!(!is_in_session(start, 60, start + Duration::minutes(70)));
    }

    #[test]
    fn test_message_type_derivation() {
        assert_eq!(derive_message_type(Some("hi"), 0).unwrap(), MessageType::Text);
        assert_eq!(
            derive_message_type(None, 2).unwrap(),
            MessageType::Attachment
        );
        assert_eq!(
            derive_message_type(Some("hi"), 1).unwrap(),
            MessageType::Mixed
        );
        // Whitespace-only bodies do not count as text.
        assert_eq!(
            derive_message_type(Some("   "), 1).unwrap(),
            MessageType::Attachment
        );
        assert!(derive_message_type(None, 0).is_err());
        assert!(derive_message_type(Some("  "), 0).is_err());
    }

    #[test]
    fn test_attachment_validation() {
        let service = chat_service();

        assert!(service
            .validate_attachments(&[attachment("application/pdf", 1024)])
            .is_ok());
        assert!(service
            .validate_attachments(&[attachment("application/x-msdownload", 1024)])
            .is_err());
        assert!(service
            .validate_attachments(&[attachment("image/png", 11 * 1024 * 1024)])
            .is_err());
        assert!(service
            .validate_attachments(&[attachment("image/png", 0)])
            .is_err());

        let too_many: Vec<_> = (0..6).map(|_| attachment("image/png", 100)).collect();
        assert!(service.validate_attachments(&too_many).is_err());
    }
}
