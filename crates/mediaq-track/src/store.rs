#![forbid(unsafe_code)]

//! Deduplicating matcher store and subscription guards.
//!
//! # Design
//!
//! The store holds one [`Entry`] per distinct query string: the platform
//! matcher (acquired at most once) plus a listener list. The matcher gets a
//! single fan-out callback at acquisition; per-subscriber callbacks are
//! stored as `Weak` references and upgraded at delivery time, so a dropped
//! [`Subscription`] can never be invoked again even when a notification is
//! already in flight.
//!
//! # Invariants
//!
//! 1. `Platform::acquire` is called at most once per query string, until
//!    [`QueryStore::clear`].
//! 2. Dropping or cancelling a `Subscription` removes exactly its own slot;
//!    the entry and the other subscribers are untouched.
//! 3. Fan-out iterates a snapshot: a callback cancelling subscriptions on
//!    the same entry cannot invalidate the delivery in progress.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use mediaq_core::Query;
use rustc_hash::FxHashMap;

use crate::platform::{Matcher, Platform};

type ListenerFn = dyn Fn(bool);

struct ListenerSlot {
    id: u64,
    callback: Weak<ListenerFn>,
}

type ListenerList = Rc<RefCell<Vec<ListenerSlot>>>;

/// One cached matcher plus its subscriber list.
struct Entry {
    matcher: Option<Box<dyn Matcher>>,
    listeners: ListenerList,
}

impl Entry {
    fn acquire(platform: &dyn Platform, query: &Query) -> Self {
        let listeners: ListenerList = Rc::new(RefCell::new(Vec::new()));
        let matcher = platform.acquire(query).map(|mut matcher| {
            let fan_out = Rc::downgrade(&listeners);
            matcher.on_change(Box::new(move |matched| {
                let Some(listeners) = fan_out.upgrade() else {
                    return;
                };
                // Snapshot before delivery: a callback may cancel
                // subscriptions on this same entry.
                let snapshot: Vec<Weak<ListenerFn>> = listeners
                    .borrow()
                    .iter()
                    .map(|slot| slot.callback.clone())
                    .collect();
                for callback in snapshot {
                    if let Some(callback) = callback.upgrade() {
                        callback(matched);
                    }
                }
                // Prune slots whose guards are gone.
                listeners
                    .borrow_mut()
                    .retain(|slot| slot.callback.strong_count() > 0);
            }));
            matcher
        });
        tracing::debug!(
            message = "store.acquire",
            query = %query,
            available = matcher.is_some()
        );
        Self { matcher, listeners }
    }

    fn matches(&self) -> bool {
        self.matcher.as_ref().is_some_and(|matcher| matcher.matches())
    }
}

struct StoreInner {
    platform: Box<dyn Platform>,
    entries: RefCell<FxHashMap<Query, Entry>>,
    next_listener_id: Cell<u64>,
}

/// Shared, deduplicating store of live query matchers.
///
/// Cloning yields another handle to the **same** store; consumers that
/// should share matchers share a store. Entries are created by
/// acquire-if-absent and live until [`clear`](Self::clear).
#[derive(Clone)]
pub struct QueryStore {
    inner: Rc<StoreInner>,
}

impl QueryStore {
    pub fn new(platform: impl Platform + 'static) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                platform: Box::new(platform),
                entries: RefCell::new(FxHashMap::default()),
                next_listener_id: Cell::new(0),
            }),
        }
    }

    /// Number of cached matcher entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live subscriber count for `query`. Zero when the query has no entry.
    #[must_use]
    pub fn listener_count(&self, query: &Query) -> usize {
        self.inner
            .entries
            .borrow()
            .get(query)
            .map_or(0, |entry| {
                entry
                    .listeners
                    .borrow()
                    .iter()
                    .filter(|slot| slot.callback.strong_count() > 0)
                    .count()
            })
    }

    /// Current state of `query`, acquiring its matcher if absent.
    #[must_use]
    pub fn matches(&self, query: &Query) -> bool {
        let mut entries = self.inner.entries.borrow_mut();
        entries
            .entry(query.clone())
            .or_insert_with(|| Entry::acquire(self.inner.platform.as_ref(), query))
            .matches()
    }

    /// Register a change callback for `query`, acquiring its matcher if
    /// absent. The callback fires on every platform delivery until the
    /// returned guard is dropped.
    pub fn subscribe(&self, query: &Query, callback: impl Fn(bool) + 'static) -> Subscription {
        let callback: Rc<ListenerFn> = Rc::new(callback);
        let id = self.inner.next_listener_id.get();
        self.inner.next_listener_id.set(id + 1);
        let listeners = {
            let mut entries = self.inner.entries.borrow_mut();
            Rc::clone(
                &entries
                    .entry(query.clone())
                    .or_insert_with(|| Entry::acquire(self.inner.platform.as_ref(), query))
                    .listeners,
            )
        };
        listeners.borrow_mut().push(ListenerSlot {
            id,
            callback: Rc::downgrade(&callback),
        });
        Subscription {
            listeners: Rc::downgrade(&listeners),
            id,
            callback: Some(callback),
        }
    }

    /// Drop every cached matcher entry.
    ///
    /// Intended for test isolation: live [`Subscription`]s become inert and
    /// the next access re-acquires matchers from the platform as from a
    /// cold start.
    pub fn clear(&self) {
        let dropped = {
            let mut entries = self.inner.entries.borrow_mut();
            let dropped = entries.len();
            entries.clear();
            dropped
        };
        tracing::debug!(message = "store.clear", dropped);
    }
}

impl fmt::Debug for QueryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryStore")
            .field("entries", &self.len())
            .finish()
    }
}

/// Keeps one change callback registered against a store entry.
///
/// Dropping the guard (or calling [`cancel`](Self::cancel)) is the only
/// way to stop delivery; both are idempotent. A fan-out in flight when the
/// guard goes away skips the dead slot.
#[must_use = "dropping a Subscription cancels it immediately"]
pub struct Subscription {
    listeners: Weak<RefCell<Vec<ListenerSlot>>>,
    id: u64,
    callback: Option<Rc<ListenerFn>>,
}

impl Subscription {
    /// Cancel explicitly. Equivalent to dropping the guard.
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.callback.take().is_none() {
            return;
        }
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.borrow_mut().retain(|slot| slot.id != self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("live", &self.callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use mediaq_core::Query;

    use super::*;
    use crate::platform::Unsupported;
    use crate::testing::FakePlatform;

    fn q(raw: &str) -> Query {
        Query::new(raw)
    }

    #[test]
    fn concurrent_subscribers_share_one_matcher() {
        let platform = FakePlatform::new();
        let store = QueryStore::new(platform.clone());
        let _a = store.subscribe(&q("(x)"), |_| {});
        let _b = store.subscribe(&q("(x)"), |_| {});
        assert_eq!(platform.acquired(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.listener_count(&q("(x)")), 2);
    }

    #[test]
    fn matches_reads_live_state() {
        let platform = FakePlatform::matching(&["(x)"]);
        let store = QueryStore::new(platform.clone());
        assert!(store.matches(&q("(x)")));
        assert!(!store.matches(&q("(y)")));
        platform.set_matched(&["(y)"]);
        assert!(!store.matches(&q("(x)")));
        assert!(store.matches(&q("(y)")));
        // Repeated reads reuse the cached matchers.
        assert_eq!(platform.acquired(), 2);
    }

    #[test]
    fn transitions_fan_out_to_every_subscriber() {
        let platform = FakePlatform::new();
        let store = QueryStore::new(platform.clone());
        let seen_a = Rc::new(RefCell::new(Vec::new()));
        let seen_b = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::clone(&seen_a);
        let b = Rc::clone(&seen_b);
        let _sub_a = store.subscribe(&q("(x)"), move |matched| a.borrow_mut().push(matched));
        let _sub_b = store.subscribe(&q("(x)"), move |matched| b.borrow_mut().push(matched));

        platform.set_matched(&["(x)"]);
        platform.set_matched(&[]);

        assert_eq!(*seen_a.borrow(), vec![true, false]);
        assert_eq!(*seen_b.borrow(), vec![true, false]);
    }

    #[test]
    fn dropped_subscription_receives_nothing() {
        let platform = FakePlatform::new();
        let store = QueryStore::new(platform.clone());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let sub = store.subscribe(&q("(x)"), move |matched| sink.borrow_mut().push(matched));

        platform.set_matched(&["(x)"]);
        sub.cancel();
        platform.set_matched(&[]);

        assert_eq!(*seen.borrow(), vec![true]);
        assert_eq!(store.listener_count(&q("(x)")), 0);
        // The entry itself survives the unsubscribe.
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn cancelling_a_peer_mid_delivery_is_safe() {
        let platform = FakePlatform::new();
        let store = QueryStore::new(platform.clone());
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let seen = Rc::new(RefCell::new(0u32));

        // First subscriber cancels the second during fan-out.
        let to_cancel = Rc::clone(&victim);
        let _killer = store.subscribe(&q("(x)"), move |_| {
            if let Some(sub) = to_cancel.borrow_mut().take() {
                sub.cancel();
            }
        });
        let count = Rc::clone(&seen);
        *victim.borrow_mut() =
            Some(store.subscribe(&q("(x)"), move |_| *count.borrow_mut() += 1));

        platform.set_matched(&["(x)"]);
        platform.set_matched(&[]);

        // The victim was cancelled before its slot in the first fan-out's
        // snapshot was reached, and stayed silent afterwards.
        assert_eq!(*seen.borrow(), 0);
        assert_eq!(store.listener_count(&q("(x)")), 1);
    }

    #[test]
    fn unsupported_platform_never_matches() {
        let store = QueryStore::new(Unsupported);
        assert!(!store.matches(&q("(x)")));
        let _sub = store.subscribe(&q("(x)"), |_| panic!("no deliveries expected"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clear_restarts_from_cold() {
        let platform = FakePlatform::matching(&["(x)"]);
        let store = QueryStore::new(platform.clone());
        let sub = store.subscribe(&q("(x)"), |_| {});
        assert_eq!(platform.acquired(), 1);

        store.clear();
        assert!(store.is_empty());
        // Cancelling a guard that outlived the clear is a no-op.
        sub.cancel();

        assert!(store.matches(&q("(x)")));
        assert_eq!(platform.acquired(), 2);
    }
}
