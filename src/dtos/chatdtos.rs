use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::chatmodels::{Message, MessageAttachment};

#[derive(Debug, Deserialize, Validate)]
pub struct GetOrCreateConversationDto {
    pub booking_id: Uuid,
}

/// Metadata of an already-stored upload; storage mechanics live outside
/// the chat core.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AttachmentDto {
    #[validate(length(min = 1, max = 255, message = "File name must be 1-255 characters"))]
    pub original_name: String,
    #[validate(length(min = 1, message = "Mime type is required"))]
    pub mime_type: String,
    pub size_bytes: i64,
    #[validate(length(min = 1, message = "Storage path is required"))]
    pub path: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageDto {
    #[validate(length(max = 4000, message = "Message body must be at most 4000 characters"))]
    pub body: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentDto>,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<i64>,
    /// Cursor: return messages with ids strictly below this.
    pub before_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MarkReadDto {
    pub message_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MessageWithAttachments {
    #[serde(flatten)]
    pub message: Message,
    pub attachments: Vec<MessageAttachment>,
}

#[derive(Debug, Serialize)]
pub struct MessagePageDto {
    pub messages: Vec<MessageWithAttachments>,
    pub unread_count: i64,
    pub next_cursor: Option<i64>,
}
