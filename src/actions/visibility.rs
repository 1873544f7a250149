use chrono::{DateTime, Utc};

use crate::domain::user_topic::{canonicalize_topic_name, ClientEvent, VisibilityPolicy};
use crate::models::{Channel, UserId};
use crate::store::{StoreError, UserTopicStore};

// ============================================================================
// Visibility Policy Actions
// ============================================================================
//
// The write path for topic visibility policies. One call is one transaction:
// rows are upserted/deleted in bulk, and notification events are queued in
// the same transaction so they are delivered only if the commit succeeds.
//
// Only users whose row actually changed are notified. A request to set a
// policy a row already holds, or to delete a row that does not exist, is a
// no-op and must not push a redundant payload to that user's clients.
//
// ============================================================================

/// Apply `visibility_policy` to (channel, topic) for every given user and
/// notify the users whose row actually changed.
///
/// For each changed user two events are queued: the deprecated full
/// `muted_topics` snapshot (unless `skip_muted_topics_event` is set) and the
/// structured `user_topic` event. Errors from the store propagate unchanged;
/// on error the transaction rolls back and nothing is delivered.
pub async fn bulk_set_user_topic_visibility_policy(
    store: &dyn UserTopicStore,
    user_ids: &[UserId],
    channel: &Channel,
    topic_name: &str,
    visibility_policy: VisibilityPolicy,
    last_updated: Option<DateTime<Utc>>,
    skip_muted_topics_event: bool,
) -> Result<(), StoreError> {
    let last_updated = last_updated.unwrap_or_else(Utc::now);
    let topic_name = canonicalize_topic_name(topic_name);

    let mut tx = store.begin().await?;

    let changed = tx
        .bulk_set_visibility_policy(
            user_ids,
            channel.id,
            &topic_name,
            visibility_policy,
            channel.recipient_id,
            last_updated,
        )
        .await?;

    if changed.is_empty() {
        // Every request was a no-op; commit the empty unit of work and skip
        // event fan-out entirely.
        tx.commit().await?;
        return Ok(());
    }

    for user_id in &changed {
        // The muted_topics snapshot is deprecated and goes away once all
        // clients handle user_topic.
        if !skip_muted_topics_event {
            let mutes = tx.topic_mutes(*user_id).await?;
            tx.queue_event_on_commit(
                &ClientEvent::muted_topics(mutes),
                std::slice::from_ref(user_id),
            )
            .await?;
        }

        tx.queue_event_on_commit(
            &ClientEvent::user_topic(channel.id, &topic_name, last_updated, visibility_policy),
            std::slice::from_ref(user_id),
        )
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        channel_id = %channel.id,
        topic_name = %topic_name,
        policy = visibility_policy.as_str(),
        requested = user_ids.len(),
        changed = changed.len(),
        "Visibility policy updated"
    );

    Ok(())
}

/// Single-user convenience wrapper around
/// [`bulk_set_user_topic_visibility_policy`].
pub async fn set_user_topic_visibility_policy(
    store: &dyn UserTopicStore,
    user_id: UserId,
    channel: &Channel,
    topic_name: &str,
    visibility_policy: VisibilityPolicy,
    last_updated: Option<DateTime<Utc>>,
    skip_muted_topics_event: bool,
) -> Result<(), StoreError> {
    bulk_set_user_topic_visibility_policy(
        store,
        &[user_id],
        channel,
        topic_name,
        visibility_policy,
        last_updated,
        skip_muted_topics_event,
    )
    .await
}

// ============================================================================
// Unit Tests
// ============================================================================
