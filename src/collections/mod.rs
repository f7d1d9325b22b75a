// ============================================================================
// pulse-reactive - Reactive Containers
// ============================================================================

pub mod record;
pub mod sequence;

pub use record::Record;
pub use sequence::Sequence;
