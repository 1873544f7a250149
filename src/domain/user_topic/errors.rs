// ============================================================================
// User Topic Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum UserTopicError {
    #[error("invalid visibility policy value: {0}")]
    InvalidVisibilityPolicy(i16),
}
