#![forbid(unsafe_code)]

//! Platform seam for query evaluation.

use mediaq_core::Query;

/// Callback invoked by a [`Matcher`] on state transitions.
pub type ChangeCallback = Box<dyn Fn(bool)>;

/// Live handle on one query's boolean state.
///
/// Creating a matcher may have observable platform side effects, so the
/// store acquires at most one per distinct query string and shares it
/// across all subscribers.
pub trait Matcher {
    /// Current state, read synchronously.
    fn matches(&self) -> bool;

    /// Install the change callback. The store installs exactly one
    /// callback per matcher and fans deliveries out to its subscribers;
    /// delivery timing is the platform's.
    fn on_change(&mut self, callback: ChangeCallback);
}

/// Source of [`Matcher`]s, implemented by the embedding platform.
pub trait Platform {
    /// Acquire a matcher for `query`.
    ///
    /// Returns `None` when the platform cannot evaluate queries; the store
    /// then reports the query as never matching and resolution falls back
    /// to device values.
    fn acquire(&self, query: &Query) -> Option<Box<dyn Matcher>>;
}

/// A platform without query evaluation. Every query reports not matched.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unsupported;

impl Platform for Unsupported {
    fn acquire(&self, _query: &Query) -> Option<Box<dyn Matcher>> {
        None
    }
}
