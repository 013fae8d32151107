#![forbid(unsafe_code)]

//! Resolution of responsive values against the live environment.

use mediaq_core::{Device, Normalized, Query, ResponsiveValue, normalize, normalize_all};
use mediaq_track::{QueryStore, QueryTracker};
use rustc_hash::FxHashSet;

/// Supplies the current canonical device class.
///
/// Implemented by the embedding device-classification layer; resolution
/// only reads it. A bare [`Device`] works for fixed-device callers.
pub trait DeviceSource {
    fn current(&self) -> Device;
}

impl DeviceSource for Device {
    fn current(&self) -> Device {
        *self
    }
}

/// Composition root: normalizes inputs, tracks their queries through a
/// shared [`QueryStore`], and picks the winning value.
///
/// Create one `Resolver` per consumer site and drop it on teardown;
/// resolvers sharing a store share platform matchers.
pub struct Resolver {
    tracker: QueryTracker,
}

impl Resolver {
    #[must_use]
    pub fn new(store: QueryStore) -> Self {
        Self {
            tracker: QueryTracker::new(store),
        }
    }

    /// The tracker backing this resolver. Useful for polling
    /// [`version`](QueryTracker::version) to decide when to re-resolve.
    #[must_use]
    pub fn tracker(&self) -> &QueryTracker {
        &self.tracker
    }

    /// Resolve one input: the first query rule currently matching, in
    /// declaration order, wins; otherwise the value for the current
    /// device.
    ///
    /// `None` is a valid outcome: a query-only input with no live match
    /// resolves to nothing rather than failing.
    pub fn resolve<T: Clone>(
        &mut self,
        input: &ResponsiveValue<T>,
        device: impl DeviceSource,
    ) -> Option<T> {
        let normalized = normalize(input);
        self.tracker.track(&normalized.query_keys());
        if let Some(winner) = self.tracker.first_match() {
            return normalized.query_value(&winner).cloned();
        }
        normalized.devices.get(device.current()).cloned()
    }

    /// Resolve a batch of named inputs against one shared subscription
    /// set.
    ///
    /// The union of every input's queries is tracked once; each key then
    /// independently applies the first-match-else-device rule over its own
    /// rules, in its own declaration order, against the shared state.
    pub fn resolve_all<K: Clone, T: Clone>(
        &mut self,
        inputs: &[(K, ResponsiveValue<T>)],
        device: impl DeviceSource,
    ) -> Vec<(K, Option<T>)> {
        let set = normalize_all(inputs.iter().map(|(key, input)| (key.clone(), input)));
        self.tracker.track(&set.queries);
        let state = self.tracker.state();
        let matched: FxHashSet<&Query> = state
            .iter()
            .filter(|(_, matched)| *matched)
            .map(|(query, _)| query)
            .collect();
        let device = device.current();
        set.entries
            .into_iter()
            .map(|(key, normalized)| {
                let value = pick(&normalized, &matched, device);
                (key, value)
            })
            .collect()
    }

    /// Drop every cached matcher in the shared store and forget this
    /// resolver's subscriptions.
    ///
    /// Test-isolation affordance: the next resolution re-acquires matchers
    /// from a cold start. Other resolvers on the same store are not reset
    /// and should be torn down separately.
    pub fn clear_cache(&mut self) {
        self.tracker.store().clear();
        self.tracker.reset();
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("tracker", &self.tracker)
            .finish()
    }
}

fn pick<T: Clone>(
    normalized: &Normalized<T>,
    matched: &FxHashSet<&Query>,
    device: Device,
) -> Option<T> {
    normalized
        .queries
        .iter()
        .find(|(query, _)| matched.contains(query))
        .map(|(_, value)| value.clone())
        .or_else(|| normalized.devices.get(device).cloned())
}
