// ============================================================================
// pulse-reactive - Shared Infrastructure
// ============================================================================

pub mod host;
