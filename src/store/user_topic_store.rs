use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::user_topic::{ClientEvent, MutedTopic, UserTopicError, VisibilityPolicy};
use crate::models::{ChannelId, RecipientId, UserId};

// ============================================================================
// Store Traits
// ============================================================================
//
// The action layer consumes four primitives, all scoped to one transaction:
//
// 1. Bulk row upsert/delete returning the users whose row actually changed
// 2. The per-user mute-list query (for the deprecated snapshot event)
// 3. A commit-deferred event queue
// 4. Commit
//
// Dropping a transaction without committing discards row changes AND queued
// events, so clients never see a notification for a rolled-back change.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt visibility-policy row: {0}")]
    Corrupt(#[from] UserTopicError),

    #[error("event serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait UserTopicStore: Send + Sync {
    /// Open a unit of work. Everything done through the returned transaction
    /// is atomic with respect to commit.
    async fn begin(&self) -> Result<Box<dyn UserTopicTransaction>, StoreError>;
}

#[async_trait]
pub trait UserTopicTransaction: Send {
    /// Apply `visibility_policy` to the (user, channel, topic) row of every
    /// given user. Returns the subset of users whose row was actually
    /// created, changed, or removed; users whose request was a no-op are
    /// excluded.
    async fn bulk_set_visibility_policy(
        &mut self,
        user_ids: &[UserId],
        channel_id: ChannelId,
        topic_name: &str,
        visibility_policy: VisibilityPolicy,
        recipient_id: RecipientId,
        last_updated: DateTime<Utc>,
    ) -> Result<Vec<UserId>, StoreError>;

    /// Current mute list of one user, oldest mute first.
    async fn topic_mutes(&mut self, user_id: UserId) -> Result<Vec<MutedTopic>, StoreError>;

    /// Queue an event for the given recipients. Delivery happens only after
    /// this transaction commits.
    async fn queue_event_on_commit(
        &mut self,
        event: &ClientEvent,
        recipients: &[UserId],
    ) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
