#![forbid(unsafe_code)]

//! Per-consumer query tracking.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use mediaq_core::Query;

use crate::store::{QueryStore, Subscription};

/// First query in `state` order whose flag is true.
///
/// Declaration order, not arrival order, is the tie-break: cross-query
/// delivery order is not guaranteed, and this keeps the externally
/// observable winner deterministic anyway.
#[must_use]
pub fn first_matching(state: &[(Query, bool)]) -> Option<&Query> {
    state
        .iter()
        .find(|(_, matched)| *matched)
        .map(|(query, _)| query)
}

/// Tracks the live state of an ordered query set for one consumer.
///
/// Create one per consumer lifetime, drop it on teardown. The tracked set
/// is compared by value on [`track`](Self::track), so repeated resolutions
/// with an unchanged set cost no listener churn.
pub struct QueryTracker {
    store: QueryStore,
    queries: Vec<Query>,
    /// Matched flags, index-aligned with `queries`; shared with the
    /// per-query listeners.
    state: Rc<RefCell<Vec<bool>>>,
    version: Rc<Cell<u64>>,
    subscriptions: Vec<Subscription>,
}

impl QueryTracker {
    #[must_use]
    pub fn new(store: QueryStore) -> Self {
        Self {
            store,
            queries: Vec::new(),
            state: Rc::new(RefCell::new(Vec::new())),
            version: Rc::new(Cell::new(0)),
            subscriptions: Vec::new(),
        }
    }

    /// The store this tracker subscribes through.
    #[must_use]
    pub fn store(&self) -> &QueryStore {
        &self.store
    }

    /// The currently tracked queries, in order.
    #[must_use]
    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    /// Subscribe to `queries`, reusing the existing subscriptions when the
    /// set is unchanged (compared by value, in order).
    ///
    /// Each query's state is read live at (re)subscription time, so a
    /// consumer joining after others still sees the present value rather
    /// than a stale snapshot. Tracking an empty set touches the platform
    /// not at all; each listener updates only its own slot.
    pub fn track(&mut self, queries: &[Query]) {
        if self.queries == queries {
            return;
        }
        // Old listeners go first, so a matcher shared between the outgoing
        // and incoming sets never delivers into the outgoing state.
        self.subscriptions.clear();
        self.queries = queries.to_vec();
        let initial: Vec<bool> = queries.iter().map(|query| self.store.matches(query)).collect();
        self.state = Rc::new(RefCell::new(initial));

        let mut subscriptions = Vec::with_capacity(queries.len());
        for (index, query) in queries.iter().enumerate() {
            let state = Rc::clone(&self.state);
            let version = Rc::clone(&self.version);
            subscriptions.push(self.store.subscribe(query, move |matched| {
                state.borrow_mut()[index] = matched;
                version.set(version.get() + 1);
            }));
        }
        self.subscriptions = subscriptions;
        tracing::debug!(message = "tracker.track", queries = self.queries.len());
    }

    /// Forget the tracked set and drop all subscriptions.
    ///
    /// Pairs with [`QueryStore::clear`] for test isolation: a cleared store
    /// plus a reset tracker behaves like a cold start.
    pub fn reset(&mut self) {
        self.subscriptions.clear();
        self.queries.clear();
        self.state = Rc::new(RefCell::new(Vec::new()));
    }

    /// Ordered (query, matched) snapshot of the tracked set.
    #[must_use]
    pub fn state(&self) -> Vec<(Query, bool)> {
        self.queries
            .iter()
            .cloned()
            .zip(self.state.borrow().iter().copied())
            .collect()
    }

    /// First tracked query currently matching, in tracked order.
    #[must_use]
    pub fn first_match(&self) -> Option<Query> {
        let state = self.state.borrow();
        self.queries
            .iter()
            .zip(state.iter())
            .find(|(_, matched)| **matched)
            .map(|(query, _)| query.clone())
    }

    /// Bumped once per delivered transition. Consumers poll this to decide
    /// whether to re-resolve.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.get()
    }
}

impl fmt::Debug for QueryTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryTracker")
            .field("queries", &self.queries)
            .field("version", &self.version.get())
            .finish()
    }
}
