use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Core Identifiers
// ============================================================================

/// Identifier of a user account.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Identifier of a channel (a named message stream users subscribe to).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ChannelId(pub i64);

/// Identifier of the message audience backing a channel. Denormalized onto
/// every visibility-policy row at write time so row scans never need a join
/// back to the channel table.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RecipientId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Channel
// ============================================================================

/// The slice of channel state the visibility-policy layer needs.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Channel {
    pub id: ChannelId,
    pub recipient_id: RecipientId,
    pub name: String,
}

impl Channel {
    pub fn new(id: i64, recipient_id: i64, name: impl Into<String>) -> Self {
        Self {
            id: ChannelId(id),
            recipient_id: RecipientId(recipient_id),
            name: name.into(),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_serializes_transparently() {
        let id = UserId(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");

        let back: UserId = serde_json::from_str("42").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_channel_construction() {
        let channel = Channel::new(7, 19, "engineering");
        assert_eq!(channel.id, ChannelId(7));
        assert_eq!(channel.recipient_id, RecipientId(19));
        assert_eq!(channel.name, "engineering");
    }
}
