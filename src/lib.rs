// ============================================================================
// pulse-reactive - A Fine-Grained Reactivity and Scheduling Core
// ============================================================================
//
// Turns records and sequences into observable values, tracks which watcher
// reads which value through per-slot deps and a target stack, and re-runs
// dirty watchers in a batched, id-ordered flush.
//
// Layering, leaves first: Dep -> target stack -> Observer -> Watcher ->
// Scheduler. The host supplies the seams (task drain, error hook,
// lifecycle hook) through shared::host.
// ============================================================================

pub mod collections;
pub mod core;
pub mod macros;
pub mod primitives;
pub mod reactivity;
pub mod shared;

// Re-export the working surface at the crate root
pub use crate::core::constants::MAX_UPDATE_COUNT;
pub use crate::core::context::{
    current_target, has_target, is_async, pop_target, push_target, set_async, toggle_observing,
};
pub use crate::core::value::{NodeRef, Value};

pub use crate::collections::{Record, Sequence};

pub use crate::reactivity::dep::Dep;
pub use crate::reactivity::equality::{same_f64, same_value};
pub use crate::reactivity::observe::{define_reactive, del, observe, set, MemberKey, Observer};
pub use crate::reactivity::scheduling::{
    current_flush_timestamp, flush_scheduler_queue, queue_activated, queue_watcher,
};
pub use crate::reactivity::traverse::traverse;

pub use crate::primitives::path::parse_path;
pub use crate::primitives::scope::Scope;
pub use crate::primitives::watcher::{WatchSource, Watcher, WatcherOptions};

pub use crate::shared::host::{
    clear_error_hook, clear_lifecycle_hook, has_deferred, is_server_rendering, next_tick, now_ms,
    run_deferred, set_error_hook, set_lifecycle_hook, set_server_rendering, LifecycleEvent,
    WatchError,
};

// =============================================================================
// TESTS
// =============================================================================
