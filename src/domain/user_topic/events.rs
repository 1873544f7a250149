use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ChannelId;
use super::value_objects::{MutedTopic, VisibilityPolicy};

// ============================================================================
// Client Events
// ============================================================================
//
// JSON payloads pushed to a user's active sessions after a visibility-policy
// change commits. Two events exist for the same change:
//
// - `muted_topics`: full mute-list snapshot. Deprecated; emitted only for
//   clients that have not migrated to `user_topic`, and suppressible per
//   call.
// - `user_topic`: the structured per-topic event carrying the changed row.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Deprecated full-snapshot event, kept for backward compatibility.
    MutedTopics { muted_topics: Vec<MutedTopicEntry> },

    /// Structured per-topic visibility change.
    UserTopic {
        channel_id: ChannelId,
        topic_name: String,
        last_updated: i64,
        visibility_policy: VisibilityPolicy,
    },
}

/// One snapshot entry; timestamps go out as epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutedTopicEntry {
    pub channel_id: ChannelId,
    pub topic_name: String,
    pub date_muted: i64,
}

impl ClientEvent {
    pub fn user_topic(
        channel_id: ChannelId,
        topic_name: &str,
        last_updated: DateTime<Utc>,
        visibility_policy: VisibilityPolicy,
    ) -> Self {
        ClientEvent::UserTopic {
            channel_id,
            topic_name: topic_name.to_string(),
            last_updated: last_updated.timestamp(),
            visibility_policy,
        }
    }

    pub fn muted_topics(mutes: Vec<MutedTopic>) -> Self {
        ClientEvent::MutedTopics {
            muted_topics: mutes
                .into_iter()
                .map(|m| MutedTopicEntry {
                    channel_id: m.channel_id,
                    topic_name: m.topic_name,
                    date_muted: m.date_muted.timestamp(),
                })
                .collect(),
        }
    }

    /// Wire name of the event, used for metrics labels and logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            ClientEvent::MutedTopics { .. } => "muted_topics",
            ClientEvent::UserTopic { .. } => "user_topic",
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_user_topic_payload_shape() {
        let last_updated = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let event = ClientEvent::user_topic(
            ChannelId(5),
            "release planning",
            last_updated,
            VisibilityPolicy::Followed,
        );

        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "user_topic");
        assert_eq!(json["channel_id"], 5);
        assert_eq!(json["topic_name"], "release planning");
        assert_eq!(json["last_updated"], last_updated.timestamp());
        assert_eq!(json["visibility_policy"], 3);
    }

    #[test]
    fn test_muted_topics_payload_shape() {
        let muted_at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        let event = ClientEvent::muted_topics(vec![MutedTopic {
            channel_id: ChannelId(5),
            topic_name: "standup".to_string(),
            date_muted: muted_at,
        }]);

        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "muted_topics");
        assert_eq!(json["muted_topics"][0]["channel_id"], 5);
        assert_eq!(json["muted_topics"][0]["topic_name"], "standup");
        assert_eq!(json["muted_topics"][0]["date_muted"], muted_at.timestamp());
    }

    #[test]
    fn test_empty_snapshot_is_valid() {
        let event = ClientEvent::muted_topics(vec![]);
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["muted_topics"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_event_type_labels() {
        assert_eq!(ClientEvent::muted_topics(vec![]).event_type(), "muted_topics");
        assert_eq!(
            ClientEvent::user_topic(ChannelId(1), "", Utc::now(), VisibilityPolicy::Muted)
                .event_type(),
            "user_topic"
        );
    }

    #[test]
    fn test_event_roundtrip() {
        let event = ClientEvent::user_topic(
            ChannelId(9),
            "general",
            Utc::now(),
            VisibilityPolicy::Unmuted,
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: ClientEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
