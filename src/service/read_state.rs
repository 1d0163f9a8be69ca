// service/read_state.rs
//
// Unread counts and read-marker advancement. Each participant's marker is
// an independent single-row update; nothing here locks or mutates the
// messages table, and a message arriving concurrently with a mark-as-read
// simply becomes the next unread item.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{chatdb::ChatExt, db::DBClient},
    dtos::chatdtos::{MessagePageDto, MessageWithAttachments},
    models::chatmodels::ConversationParticipant,
    service::error::ServiceError,
};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

/// Marker advance rule: never backward, a null marker counts as zero.
/// The SQL `GREATEST(COALESCE(..), ..)` in `mark_participant_read`
/// applies the same rule authoritatively under concurrency.
pub fn advance_marker(current: Option<i64>, target: i64) -> i64 {
    current.unwrap_or(0).max(target)
}

/// A message is unread for a reader when somebody else sent it and it
/// sits above the reader's marker. Mirrors the `unread_count` query.
pub fn counts_as_unread(
    sender_id: Uuid,
    message_id: i64,
    reader_id: Uuid,
    marker: Option<i64>,
) -> bool {
    sender_id != reader_id && message_id > marker.unwrap_or(0)
}

#[derive(Debug, Clone)]
pub struct ReadStateService {
    db_client: Arc<DBClient>,
}

impl ReadStateService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    /// Messages from the other participant above the caller's marker; a
    /// null marker counts everything.
    pub async fn unread_count(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<i64, ServiceError> {
        self.ensure_participant(conversation_id, user_id).await?;
        Ok(self.db_client.unread_count(conversation_id, user_id).await?)
    }

    /// Advances the caller's marker to `message_id`, defaulting to the
    /// conversation's current maximum. The marker never moves backward,
    /// and the other participant's row is never touched. No-op while the
    /// conversation has no messages.
    pub async fn mark_as_read(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        message_id: Option<i64>,
    ) -> Result<Option<ConversationParticipant>, ServiceError> {
        self.db_client
            .get_conversation(conversation_id)
            .await?
            .ok_or(ServiceError::ConversationNotFound(conversation_id))?;
        let participant = self
            .db_client
            .get_participant(conversation_id, user_id)
            .await?
            .ok_or(ServiceError::NotParticipant(user_id, conversation_id))?;

        let target = match message_id {
            Some(id) => id,
            None => match self.db_client.max_message_id(conversation_id).await? {
                Some(max_id) => max_id,
                None => return Ok(None),
            },
        };
        let target = advance_marker(participant.last_read_message_id, target);

        let participant = self
            .db_client
            .mark_participant_read(conversation_id, user_id, target)
            .await?;
        Ok(participant)
    }

    /// Fetches a message page and marks read up to the conversation's
    /// latest message at fetch time, not just the fetched page, so the
    /// returned unread count is 0 unless something arrived mid-request.
    pub async fn get_messages_and_mark_read(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        page_size: Option<i64>,
        before_id: Option<i64>,
    ) -> Result<MessagePageDto, ServiceError> {
        self.ensure_participant(conversation_id, user_id).await?;

        let limit = page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let max_id_at_fetch = self.db_client.max_message_id(conversation_id).await?;

        let messages = self
            .db_client
            .get_messages_page(conversation_id, limit, before_id)
            .await?;

        let mut with_attachments = Vec::with_capacity(messages.len());
        for message in messages {
            let attachments = self.db_client.get_message_attachments(message.id).await?;
            with_attachments.push(MessageWithAttachments {
                message,
                attachments,
            });
        }

        if let Some(max_id) = max_id_at_fetch {
            self.db_client
                .mark_participant_read(conversation_id, user_id, max_id)
                .await?;
        }

        let unread_count = self.db_client.unread_count(conversation_id, user_id).await?;
        let next_cursor = with_attachments
            .last()
            .map(|m| m.message.id)
            .filter(|_| with_attachments.len() as i64 == limit);

        Ok(MessagePageDto {
            messages: with_attachments,
            unread_count,
            next_cursor,
        })
    }

    async fn ensure_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.db_client
            .get_conversation(conversation_id)
            .await?
            .ok_or(ServiceError::ConversationNotFound(conversation_id))?;

        self.db_client
            .get_participant(conversation_id, user_id)
            .await?
            .ok_or(ServiceError::NotParticipant(user_id, conversation_id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    #[tokio::test]
    async fn read_state_service_wires_up() {
        let pool = PgPool::connect_lazy("postgres://localhost/consultly").unwrap();
        let svc = ReadStateService::new(Arc::new(DBClient::new(pool)));

        let _ = svc.unread_count(Uuid::nil(), Uuid::nil());
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(0_i64.clamp(1, MAX_PAGE_SIZE), 1);
        assert_eq!(500_i64.clamp(1, MAX_PAGE_SIZE), MAX_PAGE_SIZE);
        assert_eq!(50_i64.clamp(1, MAX_PAGE_SIZE), 50);
    }

    #[test]
    fn marker_never_moves_backward() {
        assert_eq!(advance_marker(Some(42), 7), 42);
        assert_eq!(advance_marker(Some(42), 42), 42);
        assert_eq!(advance_marker(Some(42), 43), 43);
    }

    #[test]
    fn null_marker_counts_as_zero() {
        assert_eq!(advance_marker(None, 5), 5);
        assert_eq!(advance_marker(None, 0), 0);
    }

    #[test]
    fn own_messages_are_never_unread() {
        let me = Uuid::new_v4();
        assert!(!counts_as_unread(me, 10, me, None));
        assert!(!counts_as_unread(me, 10, me, Some(3)));
    }

    #[test]
    fn unread_is_strictly_above_the_marker() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(counts_as_unread(other, 6, me, Some(5)));
        assert!(!counts_as_unread(other, 5, me, Some(5)));
        assert!(!counts_as_unread(other, 4, me, Some(5)));
    }

    #[test]
    fn null_marker_means_everything_from_the_other_side_is_unread() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(counts_as_unread(other, 1, me, None));
        assert!(counts_as_unread(other, 999, me, None));
    }

    // One marker per participant: advancing mine is pure arithmetic on my
    // row's value and cannot be influenced by the other side's marker.
    #[test]
    fn marker_advance_depends_only_on_own_row() {
        let mine = advance_marker(Some(3), 10);
        let theirs = advance_marker(Some(8), 10);
        assert_eq!(mine, 10);
        assert_eq!(theirs, 10);
        assert_eq!(advance_marker(Some(3), 4), 4);
    }
}
