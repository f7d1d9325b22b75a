// ============================================================================
// pulse-reactive - Dep
// A subscription channel: one per reactive property, one per observed
// container (the structural dep)
// ============================================================================
//
// Subscribers are held weakly. A watcher is kept alive by its owning scope
// (and by the scheduler queue while pending), never by the deps it reads.
// That splits the dep <-> watcher reference cycle the same way a
// source/reaction graph does, so teardown needs no cycle collector.
// ============================================================================

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::core::context::{current_target, is_async, with_context};
use crate::primitives::watcher::Watcher;

// =============================================================================
// DEP
// =============================================================================

/// A dependency channel with a monotonic id and an ordered, duplicate-free
/// subscriber list. Deduplication is the subscriber's job: `Watcher::add_dep`
/// calls `add_sub` at most once per dep per collection cycle.
pub struct Dep {
    id: u64,
    subs: RefCell<Vec<Weak<Watcher>>>,
}

impl Dep {
    pub fn new() -> Rc<Dep> {
        Rc::new(Dep {
            id: with_context(|ctx| ctx.next_dep_id()),
            subs: RefCell::new(Vec::new()),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Append a subscriber. Insertion order is creation order, which
    /// `notify` preserves.
    pub fn add_sub(&self, watcher: &Rc<Watcher>) {
        self.subs.borrow_mut().push(Rc::downgrade(watcher));
    }

    /// Drop the subscriber with the given watcher id. Dead weak entries are
    /// pruned in the same pass.
    pub fn remove_sub(&self, watcher_id: u64) {
        self.subs
            .borrow_mut()
            .retain(|weak| weak.upgrade().is_some_and(|w| w.id() != watcher_id));
    }

    /// Record a mutual dependency between this dep and the watcher currently
    /// on top of the target stack, if any.
    pub fn depend(self: &Rc<Self>) {
        if let Some(target) = current_target() {
            target.add_dep(Rc::clone(self));
        }
    }

    /// Broadcast to all live subscribers.
    ///
    /// The subscriber list is snapshotted first: running a watcher can add
    /// or remove subscriptions on this very dep, and the snapshot keeps that
    /// re-entrancy away from the iteration. When flushes are inline (async
    /// off) the snapshot is sorted by id so delivery follows creation order.
    pub fn notify(&self) {
        let subs: Vec<Rc<Watcher>> = {
            let mut subs = self.subs.borrow_mut();
            subs.retain(|weak| weak.strong_count() > 0);
            subs.iter().filter_map(Weak::upgrade).collect()
        };

        let mut subs = subs;
        if !is_async() {
            subs.sort_by_key(|w| w.id());
        }

        for watcher in subs {
            watcher.update();
        }
    }

    /// Number of live subscribers.
    pub fn sub_count(&self) -> usize {
        self.subs
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// True when the watcher with the given id is currently subscribed.
    pub fn has_sub(&self, watcher_id: u64) -> bool {
        self.subs
            .borrow()
            .iter()
            .any(|weak| weak.upgrade().is_some_and(|w| w.id() == watcher_id))
    }
}

// =============================================================================
// TESTS
// =============================================================================
