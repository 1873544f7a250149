use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::{ChannelId, RecipientId, UserId};
use super::errors::UserTopicError;

// ============================================================================
// Visibility Policy Value Objects
// ============================================================================

/// Per-user-per-topic visibility preference.
///
/// Stored as a small integer and serialized as a bare integer in client
/// payloads. `Inherit` is the absence of a preference: requesting it deletes
/// the row rather than storing a zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisibilityPolicy {
    Inherit,
    Muted,
    Unmuted,
    Followed,
}

impl VisibilityPolicy {
    pub fn as_i16(self) -> i16 {
        match self {
            VisibilityPolicy::Inherit => 0,
            VisibilityPolicy::Muted => 1,
            VisibilityPolicy::Unmuted => 2,
            VisibilityPolicy::Followed => 3,
        }
    }

    pub fn from_i16(value: i16) -> Result<Self, UserTopicError> {
        match value {
            0 => Ok(VisibilityPolicy::Inherit),
            1 => Ok(VisibilityPolicy::Muted),
            2 => Ok(VisibilityPolicy::Unmuted),
            3 => Ok(VisibilityPolicy::Followed),
            other => Err(UserTopicError::InvalidVisibilityPolicy(other)),
        }
    }

    /// Label used for metrics and structured log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            VisibilityPolicy::Inherit => "inherit",
            VisibilityPolicy::Muted => "muted",
            VisibilityPolicy::Unmuted => "unmuted",
            VisibilityPolicy::Followed => "followed",
        }
    }
}

// Clients exchange the integer encoding, not the variant name.
impl Serialize for VisibilityPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i16(self.as_i16())
    }
}

impl<'de> Deserialize<'de> for VisibilityPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i16::deserialize(deserializer)?;
        VisibilityPolicy::from_i16(value).map_err(serde::de::Error::custom)
    }
}

/// One persisted visibility-policy row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTopicRow {
    pub user_id: UserId,
    pub channel_id: ChannelId,
    pub recipient_id: RecipientId,
    pub topic_name: String,
    pub visibility_policy: VisibilityPolicy,
    pub last_updated: DateTime<Utc>,
}

/// One entry of a user's mute-list snapshot, as carried by the deprecated
/// `muted_topics` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutedTopic {
    pub channel_id: ChannelId,
    pub topic_name: String,
    pub date_muted: DateTime<Utc>,
}

// ============================================================================
// Unit Tests
// ============================================================================
