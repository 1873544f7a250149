// ============================================================================
// Domain Layer
// ============================================================================
//
// Domain-specific types and decision logic, kept separate from the store
// and realtime infrastructure. Each area gets its own subdirectory with:
// - Value objects
// - Events
// - Errors
// - Pure decision logic
//
// ============================================================================

pub mod user_topic;
