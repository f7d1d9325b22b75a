// ============================================================================
// pulse-reactive - Primitives
// Watchers, path getters, and the scope owner surface
// ============================================================================

pub mod path;
pub mod scope;
pub mod watcher;
