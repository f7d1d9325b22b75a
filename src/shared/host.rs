// ============================================================================
// pulse-reactive - Host Interface
// Deferred tasks, error reporting, lifecycle delivery, host flags
// ============================================================================
//
// The core does not own a microtask queue, an error channel, or lifecycle
// semantics; it consumes them. This module is the seam: a deferred-task
// queue the host drains at its own cadence, pluggable error and lifecycle
// hooks, the server-rendering flag, and a monotonic clock.
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Instant;

use thiserror::Error;
use tracing::error;

use crate::primitives::scope::Scope;

// =============================================================================
// DEFERRED TASKS
// =============================================================================

thread_local! {
    static TASKS: RefCell<VecDeque<Box<dyn FnOnce()>>> = RefCell::new(VecDeque::new());
}

/// Defer `task` to the next drain of the host task queue.
pub fn next_tick(task: impl FnOnce() + 'static) {
    TASKS.with(|tasks| tasks.borrow_mut().push_back(Box::new(task)));
}

/// Drain the deferred-task queue, including tasks enqueued while draining.
/// The host (or a test) calls this where a browser would run microtasks.
pub fn run_deferred() {
    loop {
        let task = TASKS.with(|tasks| tasks.borrow_mut().pop_front());
        match task {
            Some(task) => task(),
            None => break,
        }
    }
}

/// Whether any deferred task is pending.
pub fn has_deferred() -> bool {
    TASKS.with(|tasks| !tasks.borrow().is_empty())
}

// =============================================================================
// ERROR REPORTING
// =============================================================================

/// Failure of a user-supplied watcher closure. Internal watcher failures
/// are never wrapped; they propagate to the caller.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("getter for watcher \"{expression}\": {reason}")]
    Getter { expression: String, reason: String },

    #[error("callback for watcher \"{expression}\": {reason}")]
    Callback { expression: String, reason: String },
}

impl WatchError {
    pub fn expression(&self) -> &str {
        match self {
            WatchError::Getter { expression, .. } => expression,
            WatchError::Callback { expression, .. } => expression,
        }
    }
}

type ErrorHook = Rc<dyn Fn(&WatchError, Option<&Scope>)>;

thread_local! {
    static ERROR_HOOK: RefCell<Option<ErrorHook>> = const { RefCell::new(None) };
}

/// Route user-closure failures to `hook` instead of the log.
pub fn set_error_hook(hook: impl Fn(&WatchError, Option<&Scope>) + 'static) {
    ERROR_HOOK.with(|slot| *slot.borrow_mut() = Some(Rc::new(hook)));
}

pub fn clear_error_hook() {
    ERROR_HOOK.with(|slot| *slot.borrow_mut() = None);
}

pub(crate) fn report_error(err: WatchError, scope: Option<&Scope>) {
    let hook = ERROR_HOOK.with(|slot| slot.borrow().clone());
    match hook {
        Some(hook) => hook(&err, scope),
        None => error!("{err}"),
    }
}

/// Best-effort message extraction from an unwind payload.
pub(crate) fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic".to_string()
    }
}

// =============================================================================
// LIFECYCLE DELIVERY
// =============================================================================

/// Post-flush notifications delivered on scheduler snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    Updated,
    Activated,
}

type LifecycleHook = Rc<dyn Fn(LifecycleEvent, &Scope)>;

thread_local! {
    static LIFECYCLE_HOOK: RefCell<Option<LifecycleHook>> = const { RefCell::new(None) };
}

/// Receive `Updated` and `Activated` notifications after each flush.
pub fn set_lifecycle_hook(hook: impl Fn(LifecycleEvent, &Scope) + 'static) {
    LIFECYCLE_HOOK.with(|slot| *slot.borrow_mut() = Some(Rc::new(hook)));
}

pub fn clear_lifecycle_hook() {
    LIFECYCLE_HOOK.with(|slot| *slot.borrow_mut() = None);
}

pub(crate) fn emit_lifecycle(event: LifecycleEvent, scope: &Scope) {
    let hook = LIFECYCLE_HOOK.with(|slot| slot.borrow().clone());
    if let Some(hook) = hook {
        hook(event, scope);
    }
}

// =============================================================================
// HOST FLAGS & CLOCK
// =============================================================================

thread_local! {
    static SERVER_RENDERING: Cell<bool> = const { Cell::new(false) };
    static EPOCH: Instant = Instant::now();
}

/// While set, no new observers are created (server renders are one-shot;
/// tracking would be wasted work).
pub fn set_server_rendering(value: bool) {
    SERVER_RENDERING.with(|flag| flag.set(value));
}

pub fn is_server_rendering() -> bool {
    SERVER_RENDERING.with(|flag| flag.get())
}

/// Milliseconds since this thread's reactivity epoch. Flush timestamps use
/// this clock so the host can order flush-attached listeners against
/// earlier events.
pub fn now_ms() -> u64 {
    EPOCH.with(|epoch| epoch.elapsed().as_millis() as u64)
}

// =============================================================================
// TESTS
// =============================================================================
