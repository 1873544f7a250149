// ============================================================================
// Realtime Delivery
// ============================================================================
//
// Post-commit event delivery to connected clients:
// - SessionRegistry: actix actor owning the user -> active sessions map
// - OutboxRelay: background task draining committed outbox rows into the
//   registry
//
// Domain logic never talks to these directly; it only queues events inside
// its store transaction.
//
// ============================================================================

mod registry;
mod relay;

pub use registry::{
    ActiveSessionCount, DeliverToUsers, RegisterSession, SessionRegistry, UnregisterSession,
};
pub use relay::OutboxRelay;
