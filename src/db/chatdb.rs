// db/chatdb.rs
use async_trait::async_trait;
use sqlx::{Error, Postgres, Transaction};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::chatmodels::*;

#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub disk: String,
    pub path: String,
}

#[async_trait]
pub trait ChatExt {
    async fn get_conversation(&self, conversation_id: Uuid)
        -> Result<Option<Conversation>, Error>;

    async fn get_conversation_by_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<Conversation>, Error>;

    /// Idempotent create keyed on the `booking_id` uniqueness constraint:
    /// concurrent callers converge on the same row.
    async fn create_or_get_conversation(
        &self,
        booking_id: Uuid,
        participant_ids: [Uuid; 2],
    ) -> Result<Conversation, Error>;

    /// Locks the conversation row; serializes all message sends for one
    /// conversation.
    async fn lock_conversation(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        conversation_id: Uuid,
    ) -> Result<Option<Conversation>, Error>;

    async fn get_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ConversationParticipant>, Error>;

    async fn insert_message(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        conversation_id: Uuid,
        sender_id: Uuid,
        body: Option<String>,
        message_type: MessageType,
        context: MessageContext,
    ) -> Result<Message, Error>;

    async fn insert_attachment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        message_id: i64,
        attachment: &NewAttachment,
    ) -> Result<MessageAttachment, Error>;

    /// Counts a sender's out-of-session messages inside the send
    /// transaction, so two concurrent sends cannot both observe the same
    /// count.
    async fn count_out_of_session_messages(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        conversation_id: Uuid,
        sender_id: Uuid,
    ) -> Result<i64, Error>;

    async fn max_message_id(&self, conversation_id: Uuid) -> Result<Option<i64>, Error>;

    async fn unread_count(&self, conversation_id: Uuid, user_id: Uuid) -> Result<i64, Error>;

    /// Advances one participant's read marker, never backwards, and never
    /// touching the other participant's row.
    async fn mark_participant_read(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        message_id: i64,
    ) -> Result<Option<ConversationParticipant>, Error>;

    async fn get_messages_page(
        &self,
        conversation_id: Uuid,
        limit: i64,
        before_id: Option<i64>,
    ) -> Result<Vec<Message>, Error>;

    async fn get_message_attachments(
        &self,
        message_id: i64,
    ) -> Result<Vec<MessageAttachment>, Error>;
}

const MESSAGE_COLUMNS: &str = r#"id, conversation_id, sender_id, body, message_type,
    context, deleted_at, created_at"#;

#[async_trait]
impl ChatExt for DBClient {
    async fn get_conversation(
        &self,
        conversation_id: Uuid,
    ) -> Result<Option<Conversation>, Error> {
        sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, booking_id, deleted_at, created_at
            FROM conversations
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_conversation_by_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<Conversation>, Error> {
        sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, booking_id, deleted_at, created_at
            FROM conversations
            WHERE booking_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_or_get_conversation(
        &self,
        booking_id: Uuid,
        participant_ids: [Uuid; 2],
    ) -> Result<Conversation, Error> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO conversations (booking_id)
            VALUES ($1)
            ON CONFLICT (booking_id) DO NOTHING
            RETURNING id, booking_id, deleted_at, created_at
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?;

        let conversation = match inserted {
            Some(conversation) => conversation,
            // Lost the race (or the row already existed): read the winner.
            None => {
                sqlx::query_as::<_, Conversation>(
                    r#"
                    SELECT id, booking_id, deleted_at, created_at
                    FROM conversations
                    WHERE booking_id = $1
                    "#,
                )
                .bind(booking_id)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        for user_id in participant_ids {
            sqlx::query(
                r#"
                INSERT INTO conversation_participants (conversation_id, user_id)
                VALUES ($1, $2)
                ON CONFLICT (conversation_id, user_id) DO NOTHING
                "#,
            )
            .bind(conversation.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(conversation)
    }

    async fn lock_conversation(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        conversation_id: Uuid,
    ) -> Result<Option<Conversation>, Error> {
        sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, booking_id, deleted_at, created_at
            FROM conversations
            WHERE id = $1 AND deleted_at IS NULL
            FOR UPDATE
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(&mut **tx)
        .await
    }

    async fn get_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ConversationParticipant>, Error> {
        sqlx::query_as::<_, ConversationParticipant>(
            r#"
            SELECT conversation_id, user_id, last_read_message_id, last_read_at
            FROM conversation_participants
            WHERE conversation_id = $1 AND user_id = $2
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn insert_message(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        conversation_id: Uuid,
        sender_id: Uuid,
        body: Option<String>,
        message_type: MessageType,
        context: MessageContext,
    ) -> Result<Message, Error> {
        sqlx::query_as::<_, Message>(&format!(
            r#"
            INSERT INTO messages (conversation_id, sender_id, body, message_type, context)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(conversation_id)
        .bind(sender_id)
        .bind(body)
        .bind(message_type)
        .bind(context)
        .fetch_one(&mut **tx)
        .await
    }

    async fn insert_attachment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        message_id: i64,
        attachment: &NewAttachment,
    ) -> Result<MessageAttachment, Error> {
        sqlx::query_as::<_, MessageAttachment>(
            r#"
            INSERT INTO message_attachments (message_id, original_name, mime_type,
                size_bytes, disk, path)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, message_id, original_name, mime_type, size_bytes, disk, path, created_at
            "#,
        )
        .bind(message_id)
        .bind(&attachment.original_name)
        .bind(&attachment.mime_type)
        .bind(attachment.size_bytes)
        .bind(&attachment.disk)
        .bind(&attachment.path)
        .fetch_one(&mut **tx)
        .await
    }

    async fn count_out_of_session_messages(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        conversation_id: Uuid,
        sender_id: Uuid,
    ) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM messages
            WHERE conversation_id = $1
              AND sender_id = $2
              AND context = 'out_of_session'::message_context
              AND deleted_at IS NULL
            "#,
        )
        .bind(conversation_id)
        .bind(sender_id)
        .fetch_one(&mut **tx)
        .await
    }

    async fn max_message_id(&self, conversation_id: Uuid) -> Result<Option<i64>, Error> {
        sqlx::query_scalar::<_, Option<i64>>(
            r#"
            SELECT MAX(id)
            FROM messages
            WHERE conversation_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(conversation_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn unread_count(&self, conversation_id: Uuid, user_id: Uuid) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM messages m
            WHERE m.conversation_id = $1
              AND m.sender_id != $2
              AND m.deleted_at IS NULL
              AND m.id > COALESCE(
                  (SELECT cp.last_read_message_id
                   FROM conversation_participants cp
                   WHERE cp.conversation_id = $1 AND cp.user_id = $2),
                  0)
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn mark_participant_read(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        message_id: i64,
    ) -> Result<Option<ConversationParticipant>, Error> {
        sqlx::query_as::<_, ConversationParticipant>(
            r#"
            UPDATE conversation_participants
            SET last_read_message_id = GREATEST(COALESCE(last_read_message_id, 0), $3),
                last_read_at = NOW()
            WHERE conversation_id = $1 AND user_id = $2
            RETURNING conversation_id, user_id, last_read_message_id, last_read_at
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_messages_page(
        &self,
        conversation_id: Uuid,
        limit: i64,
        before_id: Option<i64>,
    ) -> Result<Vec<Message>, Error> {
        sqlx::query_as::<_, Message>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE conversation_id = $1
              AND deleted_at IS NULL
              AND ($2::bigint IS NULL OR id < $2)
            ORDER BY id DESC
            LIMIT $3
            "#
        ))
        .bind(conversation_id)
        .bind(before_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_message_attachments(
        &self,
        message_id: i64,
    ) -> Result<Vec<MessageAttachment>, Error> {
        sqlx::query_as::<_, MessageAttachment>(
            r#"
            SELECT id, message_id, original_name, mime_type, size_bytes, disk, path, created_at
            FROM message_attachments
            WHERE message_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await
    }
}
