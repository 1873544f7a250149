// ============================================================================
// User Topic Domain - Per-user topic visibility policies
// ============================================================================
//
// Everything specific to topic visibility policies lives here:
// - Value objects (VisibilityPolicy, UserTopicRow, MutedTopic)
// - Topic name canonicalization
// - Client events (user_topic, muted_topics)
// - Errors (UserTopicError)
// - Row change planning (the no-op / upsert / delete decision table)
//
// The store and realtime layers are generic infrastructure underneath this.
//
// ============================================================================

pub mod errors;
pub mod events;
pub mod plan;
pub mod topic;
pub mod value_objects;

// Re-export for convenience
pub use errors::*;
pub use events::*;
pub use plan::*;
pub use topic::*;
pub use value_objects::*;
