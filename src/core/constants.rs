// ============================================================================
// pulse-reactive - Constants
// Hard limits shared by the scheduler and its diagnostics
// ============================================================================

/// Maximum number of times a single watcher may re-enter the queue during
/// one flush before the flush aborts with a diagnostic.
pub const MAX_UPDATE_COUNT: u32 = 100;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_budget_is_one_hundred() {
        assert_eq!(MAX_UPDATE_COUNT, 100);
    }
}
