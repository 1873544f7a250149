// ============================================================================
// Actions - Orchestration over the store and event queue
// ============================================================================

pub mod visibility;

pub use visibility::{bulk_set_user_topic_visibility_policy, set_user_topic_visibility_policy};
