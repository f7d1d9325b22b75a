// ============================================================================
// pulse-reactive - Scheduler
// The FIFO-by-id dirty-watcher queue and its flush
// ============================================================================
//
// Watchers flush in ascending id order: owners are created before the
// watchers they spawn, and user watchers before render watchers, so id
// order is update order. A watcher re-queued by its own side effects lands
// strictly after the current drain position, never before it, and a
// per-watcher budget aborts runaway feedback loops.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::warn;

use crate::core::constants::MAX_UPDATE_COUNT;
use crate::core::context::is_async;
use crate::primitives::scope::Scope;
use crate::primitives::watcher::Watcher;
use crate::shared::host::{emit_lifecycle, next_tick, now_ms, LifecycleEvent};

// =============================================================================
// SCHEDULER STATE
// =============================================================================

struct SchedulerState {
    queue: RefCell<Vec<Rc<Watcher>>>,
    activated: RefCell<Vec<Scope>>,
    has: RefCell<HashSet<u64>>,
    circular: RefCell<HashMap<u64, u32>>,
    waiting: Cell<bool>,
    flushing: Cell<bool>,
    index: Cell<usize>,
    flush_timestamp: Cell<u64>,
}

thread_local! {
    static SCHEDULER: SchedulerState = SchedulerState {
        queue: RefCell::new(Vec::new()),
        activated: RefCell::new(Vec::new()),
        has: RefCell::new(HashSet::new()),
        circular: RefCell::new(HashMap::new()),
        waiting: Cell::new(false),
        flushing: Cell::new(false),
        index: Cell::new(0),
        flush_timestamp: Cell::new(0),
    };
}

fn with_scheduler<R>(f: impl FnOnce(&SchedulerState) -> R) -> R {
    SCHEDULER.with(f)
}

/// Wall-clock (thread epoch) recorded at the start of the current or most
/// recent flush. The host uses it to order listeners attached mid-flush
/// against events with earlier timestamps.
pub fn current_flush_timestamp() -> u64 {
    with_scheduler(|s| s.flush_timestamp.get())
}

// =============================================================================
// ENQUEUE
// =============================================================================

/// Enqueue a dirty watcher, deduplicated by id.
///
/// Outside a flush the watcher is appended (the flush sorts). During a
/// flush it is inserted in id order strictly after the drain position, so a
/// watcher re-queued by its own side effects runs later in the same flush
/// but never jumps ahead of the current one.
pub fn queue_watcher(watcher: Rc<Watcher>) {
    let schedule_flush = with_scheduler(|s| {
        let id = watcher.id();
        if s.has.borrow().contains(&id) {
            return false;
        }
        s.has.borrow_mut().insert(id);

        if !s.flushing.get() {
            s.queue.borrow_mut().push(watcher);
        } else {
            let mut queue = s.queue.borrow_mut();
            let index = s.index.get();
            let mut i = queue.len();
            while i > index + 1 && queue[i - 1].id() > id {
                i -= 1;
            }
            queue.insert(i, watcher);
        }

        if !s.waiting.get() {
            s.waiting.set(true);
            return true;
        }
        false
    });

    if schedule_flush {
        if is_async() {
            next_tick(flush_scheduler_queue);
        } else {
            flush_scheduler_queue();
        }
    }
}

/// Collect a scope whose activation callback should fire after this flush.
pub fn queue_activated(scope: &Scope) {
    scope.set_active(true);
    with_scheduler(|s| s.activated.borrow_mut().push(scope.clone()));
}

// =============================================================================
// FLUSH
// =============================================================================

/// Drain the queue in ascending id order.
///
/// The drain bound is read live on every step: watchers executed here may
/// enqueue more work into this same flush. `has` is cleared for a watcher
/// before it runs, so a self-re-triggering watcher is detectable (its id
/// reappears) and counted against `MAX_UPDATE_COUNT`.
pub fn flush_scheduler_queue() {
    with_scheduler(|s| {
        s.flush_timestamp.set(now_ms());
        s.flushing.set(true);
        s.queue.borrow_mut().sort_by_key(|w| w.id());
        s.index.set(0);
    });

    loop {
        let next = with_scheduler(|s| {
            let queue = s.queue.borrow();
            queue.get(s.index.get()).cloned()
        });
        let Some(watcher) = next else { break };

        watcher.call_before();
        let id = watcher.id();
        with_scheduler(|s| {
            s.has.borrow_mut().remove(&id);
        });
        watcher.run();

        let over_budget = with_scheduler(|s| {
            if s.has.borrow().contains(&id) {
                let mut circular = s.circular.borrow_mut();
                let count = circular.entry(id).or_insert(0);
                *count += 1;
                *count > MAX_UPDATE_COUNT
            } else {
                false
            }
        });
        if over_budget {
            warn!(
                id,
                expression = %watcher.expression(),
                "possible infinite update loop in watcher; aborting flush"
            );
            break;
        }

        with_scheduler(|s| s.index.set(s.index.get() + 1));
    }

    // Snapshot before reset; hooks run on the snapshots so a hook that
    // schedules new work starts a clean flush.
    let (activated, updated) = with_scheduler(|s| {
        let activated: Vec<Scope> = s.activated.borrow().clone();
        let updated: Vec<Rc<Watcher>> = s.queue.borrow().clone();

        s.index.set(0);
        s.queue.borrow_mut().clear();
        s.activated.borrow_mut().clear();
        s.has.borrow_mut().clear();
        s.circular.borrow_mut().clear();
        s.waiting.set(false);
        s.flushing.set(false);

        (activated, updated)
    });

    call_activated_hooks(&activated);
    call_updated_hooks(&updated);
}

fn call_activated_hooks(scopes: &[Scope]) {
    for scope in scopes {
        scope.set_active(true);
        emit_lifecycle(LifecycleEvent::Activated, scope);
    }
}

fn call_updated_hooks(queue: &[Rc<Watcher>]) {
    for watcher in queue.iter().rev() {
        if !watcher.is_render() {
            continue;
        }
        if let Some(scope) = watcher.scope() {
            if scope.is_mounted() && !scope.is_destroyed() {
                emit_lifecycle(LifecycleEvent::Updated, &scope);
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
