// models/chatmodels.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "message_type", rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Attachment,
    Mixed,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "message_context", rename_all = "snake_case")]
pub enum MessageContext {
    InSession,
    OutOfSession,
}

#[derive(Debug, Serialize, Clone, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Clone, Deserialize, sqlx::FromRow)]
pub struct ConversationParticipant {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    /// Monotonically non-decreasing; null until the participant has read
    /// anything at all.
    pub last_read_message_id: Option<i64>,
    pub last_read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Message {
    /// BIGSERIAL, so read markers have a total order to compare against.
    pub id: i64,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub body: Option<String>,
    pub message_type: MessageType,
    pub context: MessageContext,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct MessageAttachment {
    pub id: Uuid,
    pub message_id: i64,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub disk: String,
    pub path: String,
    pub created_at: Option<DateTime<Utc>>,
}
