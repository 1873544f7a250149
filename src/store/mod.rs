// ============================================================================
// Store Layer
// ============================================================================
//
// Persistence for visibility-policy rows plus the commit-deferred event
// queue. The transaction trait is the unit of work: row writes and queued
// events either all land at commit or all vanish when the transaction is
// dropped.
//
// ============================================================================

mod memory;
mod postgres;
mod user_topic_store;

pub use memory::{DeliveredEvent, MemoryUserTopicStore};
pub use postgres::{OutboxEvent, PgUserTopicStore};
pub use user_topic_store::{StoreError, UserTopicStore, UserTopicTransaction};
