// ============================================================================
// Topic Name Canonicalization
// ============================================================================
//
// The empty topic is what clients render as "general chat". Requests may
// carry either spelling; rows and event payloads always store the canonical
// empty form so that muting "general chat" and muting "" hit the same row.
//
// ============================================================================

/// Display name clients use for the empty topic.
pub const GENERAL_CHAT_TOPIC_NAME: &str = "general chat";

/// Map the "general chat" display name to the canonical empty topic.
/// All other topic names pass through unchanged.
pub fn canonicalize_topic_name(topic_name: &str) -> String {
    if topic_name.eq_ignore_ascii_case(GENERAL_CHAT_TOPIC_NAME) {
        String::new()
    } else {
        topic_name.to_string()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_general_chat_maps_to_empty_topic() {
        assert_eq!(canonicalize_topic_name("general chat"), "");
        assert_eq!(canonicalize_topic_name("General Chat"), "");
        assert_eq!(canonicalize_topic_name("GENERAL CHAT"), "");
    }

    #[test]
    fn test_regular_topics_pass_through() {
        assert_eq!(canonicalize_topic_name("release planning"), "release planning");
        assert_eq!(canonicalize_topic_name(""), "");
    }

    #[test]
    fn test_near_misses_are_not_canonicalized() {
        assert_eq!(canonicalize_topic_name("general chat "), "general chat ");
        assert_eq!(canonicalize_topic_name("general  chat"), "general  chat");
    }
}
