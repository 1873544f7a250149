// Only the test suite constructs this store today.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::domain::user_topic::{
    plan_row_change, ClientEvent, MutedTopic, RowChange, UserTopicRow, VisibilityPolicy,
};
use crate::models::{ChannelId, RecipientId, UserId};
use super::user_topic_store::{StoreError, UserTopicStore, UserTopicTransaction};

// ============================================================================
// In-Memory Store
// ============================================================================
//
// Same contract as the Postgres store, backed by a map. A transaction works
// on a snapshot of the row set and stages its queued events; commit swaps
// the snapshot in and appends the staged events to the delivered log.
// Dropping the transaction discards both.
//
// Used by the test suite and by demos that do not want a database. Not
// intended for concurrent writers: two simultaneous transactions commit
// last-writer-wins over the whole row set.
//
// ============================================================================

type RowKey = (UserId, ChannelId, String);

/// An event that survived a commit, with its audience.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredEvent {
    pub event: ClientEvent,
    pub recipients: Vec<UserId>,
}

#[derive(Default)]
struct MemoryState {
    rows: BTreeMap<RowKey, UserTopicRow>,
    delivered: Vec<DeliveredEvent>,
}

#[derive(Default, Clone)]
pub struct MemoryUserTopicStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryUserTopicStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events delivered by committed transactions, in emission order.
    pub fn delivered_events(&self) -> Vec<DeliveredEvent> {
        self.state.lock().expect("store lock poisoned").delivered.clone()
    }

    /// Current row for (user, channel, topic), if one exists.
    pub fn row(
        &self,
        user_id: UserId,
        channel_id: ChannelId,
        topic_name: &str,
    ) -> Option<UserTopicRow> {
        let state = self.state.lock().expect("store lock poisoned");
        state
            .rows
            .get(&(user_id, channel_id, topic_name.to_string()))
            .cloned()
    }

    pub fn row_count(&self) -> usize {
        self.state.lock().expect("store lock poisoned").rows.len()
    }
}

#[async_trait]
impl UserTopicStore for MemoryUserTopicStore {
    async fn begin(&self) -> Result<Box<dyn UserTopicTransaction>, StoreError> {
        let rows = self.state.lock().expect("store lock poisoned").rows.clone();
        Ok(Box::new(MemoryTransaction {
            state: self.state.clone(),
            rows,
            queued: Vec::new(),
        }))
    }
}

struct MemoryTransaction {
    state: Arc<Mutex<MemoryState>>,
    rows: BTreeMap<RowKey, UserTopicRow>,
    queued: Vec<DeliveredEvent>,
}

#[async_trait]
impl UserTopicTransaction for MemoryTransaction {
    async fn bulk_set_visibility_policy(
        &mut self,
        user_ids: &[UserId],
        channel_id: ChannelId,
        topic_name: &str,
        visibility_policy: VisibilityPolicy,
        recipient_id: RecipientId,
        last_updated: DateTime<Utc>,
    ) -> Result<Vec<UserId>, StoreError> {
        let mut changed = Vec::new();

        for &user_id in user_ids {
            let key = (user_id, channel_id, topic_name.to_string());
            let current = self.rows.get(&key).map(|row| row.visibility_policy);

            match plan_row_change(current, visibility_policy) {
                RowChange::Insert | RowChange::Update => {
                    self.rows.insert(
                        key,
                        UserTopicRow {
                            user_id,
                            channel_id,
                            recipient_id,
                            topic_name: topic_name.to_string(),
                            visibility_policy,
                            last_updated,
                        },
                    );
                    changed.push(user_id);
                }
                RowChange::Delete => {
                    self.rows.remove(&key);
                    changed.push(user_id);
                }
                RowChange::Noop => {}
            }
        }

        Ok(changed)
    }

    async fn topic_mutes(&mut self, user_id: UserId) -> Result<Vec<MutedTopic>, StoreError> {
        let mut mutes: Vec<MutedTopic> = self
            .rows
            .values()
            .filter(|row| {
                row.user_id == user_id && row.visibility_policy == VisibilityPolicy::Muted
            })
            .map(|row| MutedTopic {
                channel_id: row.channel_id,
                topic_name: row.topic_name.clone(),
                date_muted: row.last_updated,
            })
            .collect();

        mutes.sort_by_key(|m| m.date_muted);
        Ok(mutes)
    }

    async fn queue_event_on_commit(
        &mut self,
        event: &ClientEvent,
        recipients: &[UserId],
    ) -> Result<(), StoreError> {
        self.queued.push(DeliveredEvent {
            event: event.clone(),
            recipients: recipients.to_vec(),
        });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("store lock poisoned");
        state.rows = self.rows;
        state.delivered.extend(self.queued);
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn muted_topics_probe() -> ClientEvent {
        ClientEvent::muted_topics(vec![])
    }

    #[tokio::test]
    async fn test_commit_applies_rows_and_events() {
        let store = MemoryUserTopicStore::new();

        let mut tx = store.begin().await.unwrap();
        let changed = tx
            .bulk_set_visibility_policy(
                &[UserId(1)],
                ChannelId(10),
                "standup",
                VisibilityPolicy::Muted,
                RecipientId(100),
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(changed, vec![UserId(1)]);

        tx.queue_event_on_commit(&muted_topics_probe(), &[UserId(1)])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let row = store.row(UserId(1), ChannelId(10), "standup").unwrap();
        assert_eq!(row.visibility_policy, VisibilityPolicy::Muted);
        assert_eq!(store.delivered_events().len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_everything() {
        let store = MemoryUserTopicStore::new();

        {
            let mut tx = store.begin().await.unwrap();
            tx.bulk_set_visibility_policy(
                &[UserId(1)],
                ChannelId(10),
                "standup",
                VisibilityPolicy::Muted,
                RecipientId(100),
                Utc::now(),
            )
            .await
            .unwrap();
            tx.queue_event_on_commit(&muted_topics_probe(), &[UserId(1)])
                .await
                .unwrap();
            // No commit.
        }

        assert_eq!(store.row_count(), 0);
        assert!(store.delivered_events().is_empty());
    }

    #[tokio::test]
    async fn test_changed_set_excludes_noops() {
        let store = MemoryUserTopicStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.bulk_set_visibility_policy(
            &[UserId(1)],
            ChannelId(10),
            "standup",
            VisibilityPolicy::Muted,
            RecipientId(100),
            Utc::now(),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        // User 1 already muted; user 2 is new. Only user 2 changes.
        let mut tx = store.begin().await.unwrap();
        let changed = tx
            .bulk_set_visibility_policy(
                &[UserId(1), UserId(2)],
                ChannelId(10),
                "standup",
                VisibilityPolicy::Muted,
                RecipientId(100),
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(changed, vec![UserId(2)]);
    }

    #[tokio::test]
    async fn test_inherit_deletes_row() {
        let store = MemoryUserTopicStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.bulk_set_visibility_policy(
            &[UserId(1)],
            ChannelId(10),
            "standup",
            VisibilityPolicy::Followed,
            RecipientId(100),
            Utc::now(),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.row_count(), 1);

        let mut tx = store.begin().await.unwrap();
        let changed = tx
            .bulk_set_visibility_policy(
                &[UserId(1)],
                ChannelId(10),
                "standup",
                VisibilityPolicy::Inherit,
                RecipientId(100),
                Utc::now(),
            )
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(changed, vec![UserId(1)]);
        assert_eq!(store.row_count(), 0);
    }

    #[tokio::test]
    async fn test_topic_mutes_only_returns_muted_rows() {
        let store = MemoryUserTopicStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.bulk_set_visibility_policy(
            &[UserId(1)],
            ChannelId(10),
            "standup",
            VisibilityPolicy::Muted,
            RecipientId(100),
            Utc::now(),
        )
        .await
        .unwrap();
        tx.bulk_set_visibility_policy(
            &[UserId(1)],
            ChannelId(10),
            "release planning",
            VisibilityPolicy::Followed,
            RecipientId(100),
            Utc::now(),
        )
        .await
        .unwrap();

        let mutes = tx.topic_mutes(UserId(1)).await.unwrap();
        assert_eq!(mutes.len(), 1);
        assert_eq!(mutes[0].topic_name, "standup");
        assert_eq!(mutes[0].channel_id, ChannelId(10));
    }
}
