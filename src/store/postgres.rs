use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::user_topic::{
    plan_row_change, ClientEvent, MutedTopic, RowChange, VisibilityPolicy,
};
use crate::models::{ChannelId, RecipientId, UserId};
use super::user_topic_store::{StoreError, UserTopicStore, UserTopicTransaction};

// ============================================================================
// Postgres Store - Rows + Transactional Outbox
// ============================================================================
//
// Visibility-policy rows and queued events live in the same database, and a
// unit of work touches both inside one sqlx transaction. Queued events are
// rows in `event_outbox`; they become visible to the relay only when the
// transaction commits, which is what makes delivery commit-deferred. A
// rolled-back transaction leaves no outbox row behind.
//
// ============================================================================

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS user_topics (
        user_id BIGINT NOT NULL,
        channel_id BIGINT NOT NULL,
        recipient_id BIGINT NOT NULL,
        topic_name TEXT NOT NULL,
        visibility_policy SMALLINT NOT NULL,
        last_updated TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (user_id, channel_id, topic_name)
    )",
    "CREATE TABLE IF NOT EXISTS event_outbox (
        seq BIGSERIAL PRIMARY KEY,
        id UUID NOT NULL,
        payload TEXT NOT NULL,
        recipients BIGINT[] NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        delivered_at TIMESTAMPTZ
    )",
    "CREATE INDEX IF NOT EXISTS event_outbox_undelivered
        ON event_outbox (seq) WHERE delivered_at IS NULL",
];

/// An undelivered outbox row, as handed to the relay.
#[derive(Debug, Clone)]
pub struct OutboxEvent {
    pub seq: i64,
    pub payload: String,
    pub recipients: Vec<UserId>,
}

#[derive(Clone)]
pub struct PgUserTopicStore {
    pool: PgPool,
}

impl PgUserTopicStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Create the tables this store needs if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!("user_topics schema ready");
        Ok(())
    }

    /// Committed, not-yet-delivered events in emission order.
    pub async fn undelivered_events(&self, limit: i64) -> Result<Vec<OutboxEvent>, StoreError> {
        let rows = sqlx::query(
            "SELECT seq, payload, recipients FROM event_outbox
             WHERE delivered_at IS NULL
             ORDER BY seq
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let recipients: Vec<i64> = row.try_get("recipients")?;
            events.push(OutboxEvent {
                seq: row.try_get("seq")?,
                payload: row.try_get("payload")?,
                recipients: recipients.into_iter().map(UserId).collect(),
            });
        }
        Ok(events)
    }

    pub async fn mark_delivered(&self, seq: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE event_outbox SET delivered_at = $1 WHERE seq = $2")
            .bind(Utc::now())
            .bind(seq)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserTopicStore for PgUserTopicStore {
    async fn begin(&self) -> Result<Box<dyn UserTopicTransaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUserTopicTransaction { tx }))
    }
}

pub struct PgUserTopicTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UserTopicTransaction for PgUserTopicTransaction {
    async fn bulk_set_visibility_policy(
        &mut self,
        user_ids: &[UserId],
        channel_id: ChannelId,
        topic_name: &str,
        visibility_policy: VisibilityPolicy,
        recipient_id: RecipientId,
        last_updated: DateTime<Utc>,
    ) -> Result<Vec<UserId>, StoreError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let requested: Vec<i64> = user_ids.iter().map(|u| u.0).collect();

        // Lock and read the existing rows so the change plan and the writes
        // below see the same state.
        let mut current: HashMap<UserId, VisibilityPolicy> = HashMap::new();
        let mut rows = sqlx::query(
            "SELECT user_id, visibility_policy FROM user_topics
             WHERE channel_id = $1 AND topic_name = $2 AND user_id = ANY($3)
             FOR UPDATE",
        )
        .bind(channel_id.0)
        .bind(topic_name)
        .bind(&requested)
        .fetch(&mut *self.tx);

        while let Some(row) = rows.try_next().await? {
            let user_id: i64 = row.try_get("user_id")?;
            let policy: i16 = row.try_get("visibility_policy")?;
            current.insert(UserId(user_id), VisibilityPolicy::from_i16(policy)?);
        }
        drop(rows);

        let mut to_upsert: Vec<i64> = Vec::new();
        let mut to_delete: Vec<i64> = Vec::new();
        let mut changed: Vec<UserId> = Vec::new();

        for &user_id in user_ids {
            match plan_row_change(current.get(&user_id).copied(), visibility_policy) {
                RowChange::Insert | RowChange::Update => {
                    to_upsert.push(user_id.0);
                    changed.push(user_id);
                }
                RowChange::Delete => {
                    to_delete.push(user_id.0);
                    changed.push(user_id);
                }
                RowChange::Noop => {}
            }
        }

        if !to_upsert.is_empty() {
            sqlx::query(
                "INSERT INTO user_topics
                    (user_id, channel_id, recipient_id, topic_name, visibility_policy, last_updated)
                 SELECT u, $2, $3, $4, $5, $6 FROM UNNEST($1::bigint[]) AS u
                 ON CONFLICT (user_id, channel_id, topic_name)
                 DO UPDATE SET
                    visibility_policy = EXCLUDED.visibility_policy,
                    recipient_id = EXCLUDED.recipient_id,
                    last_updated = EXCLUDED.last_updated",
            )
            .bind(&to_upsert)
            .bind(channel_id.0)
            .bind(recipient_id.0)
            .bind(topic_name)
            .bind(visibility_policy.as_i16())
            .bind(last_updated)
            .execute(&mut *self.tx)
            .await?;
        }

        if !to_delete.is_empty() {
            sqlx::query(
                "DELETE FROM user_topics
                 WHERE channel_id = $1 AND topic_name = $2 AND user_id = ANY($3)",
            )
            .bind(channel_id.0)
            .bind(topic_name)
            .bind(&to_delete)
            .execute(&mut *self.tx)
            .await?;
        }

        tracing::debug!(
            channel_id = %channel_id,
            topic_name = topic_name,
            policy = visibility_policy.as_str(),
            requested = user_ids.len(),
            changed = changed.len(),
            "Applied bulk visibility-policy change"
        );

        Ok(changed)
    }

    async fn topic_mutes(&mut self, user_id: UserId) -> Result<Vec<MutedTopic>, StoreError> {
        let rows = sqlx::query(
            "SELECT channel_id, topic_name, last_updated FROM user_topics
             WHERE user_id = $1 AND visibility_policy = $2
             ORDER BY last_updated",
        )
        .bind(user_id.0)
        .bind(VisibilityPolicy::Muted.as_i16())
        .fetch_all(&mut *self.tx)
        .await?;

        let mut mutes = Vec::with_capacity(rows.len());
        for row in rows {
            mutes.push(MutedTopic {
                channel_id: ChannelId(row.try_get("channel_id")?),
                topic_name: row.try_get("topic_name")?,
                date_muted: row.try_get("last_updated")?,
            });
        }
        Ok(mutes)
    }

    async fn queue_event_on_commit(
        &mut self,
        event: &ClientEvent,
        recipients: &[UserId],
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(event)?;
        let recipient_ids: Vec<i64> = recipients.iter().map(|u| u.0).collect();

        sqlx::query(
            "INSERT INTO event_outbox (id, payload, recipients, created_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(&payload)
        .bind(&recipient_ids)
        .bind(Utc::now())
        .execute(&mut *self.tx)
        .await?;

        tracing::debug!(
            event_type = event.event_type(),
            recipients = recipients.len(),
            "Queued event for delivery on commit"
        );

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
