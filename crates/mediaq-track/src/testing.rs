#![forbid(unsafe_code)]

//! Deterministic in-memory platform for tests.
//!
//! Mirrors the browser-style harness the real integration is tested
//! against: a settable matched-query set, listeners fired on every change,
//! and counters for acquisitions and installed callbacks.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use mediaq_core::Query;
use rustc_hash::FxHashSet;

use crate::platform::{ChangeCallback, Matcher, Platform};

type CallbackCell = Rc<RefCell<Option<ChangeCallback>>>;

struct FakeInner {
    matched: FxHashSet<String>,
    /// One weak callback cell per live matcher, with its query string.
    cells: Vec<(String, Weak<RefCell<Option<ChangeCallback>>>)>,
    acquired: usize,
    installed: usize,
}

/// Shared fake platform.
///
/// `Clone` hands out another handle to the same state: keep one handle in
/// the test and give another to the store.
#[derive(Clone)]
pub struct FakePlatform {
    inner: Rc<RefCell<FakeInner>>,
}

impl FakePlatform {
    /// A platform with no matching queries.
    #[must_use]
    pub fn new() -> Self {
        Self::matching(&[])
    }

    /// A platform whose initially matching queries are `queries`.
    #[must_use]
    pub fn matching(queries: &[&str]) -> Self {
        Self {
            inner: Rc::new(RefCell::new(FakeInner {
                matched: queries.iter().map(|q| (*q).to_owned()).collect(),
                cells: Vec::new(),
                acquired: 0,
                installed: 0,
            })),
        }
    }

    /// Replace the matched set and fire every live matcher's callback with
    /// its current state. Listeners fire even when their own query did not
    /// flip, matching the browser's resize behavior.
    pub fn set_matched(&self, queries: &[&str]) {
        let snapshot: Vec<(CallbackCell, bool)> = {
            let mut inner = self.inner.borrow_mut();
            inner.matched = queries.iter().map(|q| (*q).to_owned()).collect();
            inner.cells.retain(|(_, cell)| cell.strong_count() > 0);
            inner
                .cells
                .iter()
                .filter_map(|(query, cell)| {
                    cell.upgrade().map(|cell| (cell, inner.matched.contains(query)))
                })
                .collect()
        };
        for (cell, matched) in snapshot {
            if let Some(callback) = cell.borrow().as_ref() {
                callback(matched);
            }
        }
    }

    /// Total `Platform::acquire` calls.
    #[must_use]
    pub fn acquired(&self) -> usize {
        self.inner.borrow().acquired
    }

    /// Total `Matcher::on_change` installations.
    #[must_use]
    pub fn installed(&self) -> usize {
        self.inner.borrow().installed
    }
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FakePlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("FakePlatform")
            .field("matched", &inner.matched)
            .field("acquired", &inner.acquired)
            .finish()
    }
}

struct FakeMatcher {
    query: String,
    inner: Rc<RefCell<FakeInner>>,
    cell: CallbackCell,
}

impl Matcher for FakeMatcher {
    fn matches(&self) -> bool {
        self.inner.borrow().matched.contains(&self.query)
    }

    fn on_change(&mut self, callback: ChangeCallback) {
        *self.cell.borrow_mut() = Some(callback);
        self.inner.borrow_mut().installed += 1;
    }
}

impl Platform for FakePlatform {
    fn acquire(&self, query: &Query) -> Option<Box<dyn Matcher>> {
        let cell: CallbackCell = Rc::new(RefCell::new(None));
        let mut inner = self.inner.borrow_mut();
        inner.acquired += 1;
        inner
            .cells
            .push((query.as_str().to_owned(), Rc::downgrade(&cell)));
        Some(Box::new(FakeMatcher {
            query: query.as_str().to_owned(),
            inner: Rc::clone(&self.inner),
            cell,
        }))
    }
}
