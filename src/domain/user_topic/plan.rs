use super::value_objects::VisibilityPolicy;

// ============================================================================
// Row Change Planning
// ============================================================================
//
// The decision table for a single (user, channel, topic) row. Both store
// implementations run every requested user through this planner so that
// "which users actually changed" means the same thing everywhere:
//
//   current row        target policy   change
//   -----------        -------------   ------
//   absent             Inherit         Noop   (nothing to delete)
//   absent             other           Insert
//   present, same      same            Noop   (idempotent write)
//   present            Inherit         Delete
//   present, differs   other           Update
//
// Noop users are excluded from the changed set and therefore from event
// fan-out.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowChange {
    Insert,
    Update,
    Delete,
    Noop,
}

/// Decide what applying `target` does to a row currently holding `current`
/// (`None` when no row exists).
pub fn plan_row_change(current: Option<VisibilityPolicy>, target: VisibilityPolicy) -> RowChange {
    match (current, target) {
        (None, VisibilityPolicy::Inherit) => RowChange::Noop,
        (None, _) => RowChange::Insert,
        (Some(_), VisibilityPolicy::Inherit) => RowChange::Delete,
        (Some(current), target) if current == target => RowChange::Noop,
        (Some(_), _) => RowChange::Update,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
