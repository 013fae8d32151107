#![forbid(unsafe_code)]

//! Normalization: raw responsive inputs into canonical per-device values
//! plus declaration-ordered query rules.
//!
//! # Invariants
//!
//! 1. All three canonical device slots are present in the output (possibly
//!    `None`).
//! 2. Each device slot holds the first defined value of that device's
//!    fallback chain; `0`, `false`, and `""` are defined values.
//! 3. `queries` contains exactly the query rules of the input, in
//!    declaration order.
//! 4. The `mobile`/`phone`/`tablet` collision diagnostic never changes the
//!    computed output.

use rustc_hash::FxHashSet;

use crate::device::Device;
use crate::value::{Query, ResponsiveValue, Rules, Slot};

/// Per-device values after normalization.
///
/// `None` means no rule is reachable for that device, which can only happen
/// for query-only inputs: a single defined device or alias slot fills every
/// canonical slot through fallback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceValues<T> {
    pub phone: Option<T>,
    pub tablet: Option<T>,
    pub desktop: Option<T>,
}

impl<T> DeviceValues<T> {
    /// The value for one canonical device.
    #[must_use]
    pub fn get(&self, device: Device) -> Option<&T> {
        match device {
            Device::Phone => self.phone.as_ref(),
            Device::Tablet => self.tablet.as_ref(),
            Device::Desktop => self.desktop.as_ref(),
        }
    }

    fn splat(value: &T) -> Self
    where
        T: Clone,
    {
        Self {
            phone: Some(value.clone()),
            tablet: Some(value.clone()),
            desktop: Some(value.clone()),
        }
    }
}

impl<T> Default for DeviceValues<T> {
    fn default() -> Self {
        Self {
            phone: None,
            tablet: None,
            desktop: None,
        }
    }
}

/// The canonical form of one responsive input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Normalized<T> {
    pub devices: DeviceValues<T>,
    /// Query rules in declaration order, which is their priority order.
    pub queries: Vec<(Query, T)>,
}

impl<T> Normalized<T> {
    /// The query keys, in declaration order.
    #[must_use]
    pub fn query_keys(&self) -> Vec<Query> {
        self.queries.iter().map(|(query, _)| query.clone()).collect()
    }

    /// The value ruled by `query`, if declared.
    #[must_use]
    pub fn query_value(&self, query: &Query) -> Option<&T> {
        self.queries
            .iter()
            .find(|(q, _)| q == query)
            .map(|(_, value)| value)
    }
}

/// Batch normalization result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedSet<K, T> {
    /// One normalized input per key, in input order.
    pub entries: Vec<(K, Normalized<T>)>,
    /// Union of every input's query keys, deduplicated, in first-seen order.
    pub queries: Vec<Query>,
}

const PHONE_CHAIN: [Slot; 4] = [Slot::Phone, Slot::Mobile, Slot::Tablet, Slot::Desktop];
const TABLET_CHAIN: [Slot; 4] = [Slot::Tablet, Slot::Mobile, Slot::Desktop, Slot::Phone];
const DESKTOP_CHAIN: [Slot; 4] = [Slot::Desktop, Slot::Tablet, Slot::Phone, Slot::Mobile];

fn first_defined<'a, T>(rules: &'a Rules<T>, chain: &[Slot; 4]) -> Option<&'a T> {
    chain.iter().find_map(|&slot| rules.slot(slot))
}

/// Warn when the legacy `mobile` alias collides with an explicit `phone` or
/// `tablet` rule. Advisory only; the explicit rules win regardless.
fn warn_on_mobile_collision<T>(rules: &Rules<T>) {
    if rules.mobile_value().is_none() {
        return;
    }
    let mut explicit = Vec::new();
    if rules.device_value(Device::Phone).is_some() {
        explicit.push("\"phone\"");
    }
    if rules.device_value(Device::Tablet).is_some() {
        explicit.push("\"tablet\"");
    }
    if explicit.is_empty() {
        return;
    }
    let label = explicit.join(" and ");
    let noun = if explicit.len() > 1 { "values" } else { "value" };
    tracing::warn!(
        "a \"mobile\" rule is defined alongside {label} {noun}; use \"phone\" and \"tablet\" instead"
    );
}

/// Normalize one responsive input.
///
/// A plain value fills every device slot; a rule map is resolved through
/// each device's fallback chain (first defined wins):
///
/// - phone: phone, mobile, tablet, desktop
/// - tablet: tablet, mobile, desktop, phone
/// - desktop: desktop, tablet, phone, mobile
pub fn normalize<T: Clone>(input: &ResponsiveValue<T>) -> Normalized<T> {
    match input {
        ResponsiveValue::Plain(value) => Normalized {
            devices: DeviceValues::splat(value),
            queries: Vec::new(),
        },
        ResponsiveValue::Rules(rules) => {
            warn_on_mobile_collision(rules);
            Normalized {
                devices: DeviceValues {
                    phone: first_defined(rules, &PHONE_CHAIN).cloned(),
                    tablet: first_defined(rules, &TABLET_CHAIN).cloned(),
                    desktop: first_defined(rules, &DESKTOP_CHAIN).cloned(),
                },
                queries: rules.queries().to_vec(),
            }
        }
    }
}

/// Normalize a batch of named inputs and collect the union of their query
/// keys, deduplicated in first-seen order across inputs processed in input
/// order.
pub fn normalize_all<'a, K, T, I>(inputs: I) -> NormalizedSet<K, T>
where
    T: Clone + 'a,
    I: IntoIterator<Item = (K, &'a ResponsiveValue<T>)>,
{
    let mut entries = Vec::new();
    let mut seen = FxHashSet::default();
    let mut queries = Vec::new();
    for (key, input) in inputs {
        let normalized = normalize(input);
        for (query, _) in &normalized.queries {
            if seen.insert(query.clone()) {
                queries.push(query.clone());
            }
        }
        entries.push((key, normalized));
    }
    NormalizedSet { entries, queries }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    fn rules<T>(rules: Rules<T>) -> ResponsiveValue<T> {
        ResponsiveValue::from(rules)
    }

    #[test]
    fn plain_value_fills_every_device() {
        let normalized = normalize(&ResponsiveValue::plain(1));
        for device in Device::ALL {
            assert_eq!(normalized.devices.get(device), Some(&1));
        }
        assert!(normalized.queries.is_empty());
    }

    #[test]
    fn single_slot_fills_every_device() {
        let single = [
            rules(Rules::new().device(Device::Desktop, 1)),
            rules(Rules::new().device(Device::Tablet, 1)),
            rules(Rules::new().device(Device::Phone, 1)),
            rules(Rules::new().mobile(1)),
        ];
        for input in &single {
            let normalized = normalize(input);
            for device in Device::ALL {
                assert_eq!(normalized.devices.get(device), Some(&1), "{input:?}");
            }
        }
    }

    #[test]
    fn explicit_rules_pass_through() {
        let normalized = normalize(&rules(
            Rules::new()
                .device(Device::Desktop, 1)
                .device(Device::Tablet, 2)
                .device(Device::Phone, 3),
        ));
        assert_eq!(normalized.devices.desktop, Some(1));
        assert_eq!(normalized.devices.tablet, Some(2));
        assert_eq!(normalized.devices.phone, Some(3));
    }

    #[test]
    fn tablet_prefers_desktop_over_phone() {
        let normalized = normalize(&rules(
            Rules::new().device(Device::Desktop, 1).device(Device::Phone, 2),
        ));
        assert_eq!(normalized.devices.tablet, Some(1));
    }

    #[test]
    fn phone_prefers_tablet_over_desktop() {
        let normalized = normalize(&rules(
            Rules::new().device(Device::Tablet, 1).device(Device::Desktop, 2),
        ));
        assert_eq!(normalized.devices.phone, Some(1));
    }

    #[test]
    fn mobile_covers_phone_and_tablet_before_desktop() {
        let normalized = normalize(&rules(
            Rules::new().mobile(1).device(Device::Desktop, 2),
        ));
        assert_eq!(normalized.devices.phone, Some(1));
        assert_eq!(normalized.devices.tablet, Some(1));
        assert_eq!(normalized.devices.desktop, Some(2));
    }

    #[traced_test]
    #[test]
    fn mobile_never_wins_over_explicit_rules() {
        let normalized = normalize(&rules(
            Rules::new()
                .device(Device::Phone, 1)
                .mobile(2)
                .device(Device::Tablet, 3)
                .device(Device::Desktop, 4),
        ));
        assert_eq!(normalized.devices.phone, Some(1));
        assert_eq!(normalized.devices.tablet, Some(3));
        assert_eq!(normalized.devices.desktop, Some(4));
        assert!(logs_contain("\"phone\" and \"tablet\" values"));
    }

    #[traced_test]
    #[test]
    fn collision_warning_names_the_single_colliding_rule() {
        let _ = normalize(&rules(Rules::new().mobile(2).device(Device::Tablet, 3)));
        assert!(logs_contain("alongside \"tablet\" value;"));
        assert!(!logs_contain("\"phone\" and \"tablet\" values"));
    }

    #[traced_test]
    #[test]
    fn mobile_alone_does_not_warn() {
        let _ = normalize(&rules(Rules::new().mobile(1).device(Device::Desktop, 2)));
        assert!(!logs_contain("alongside"));
    }

    #[test]
    fn zero_and_false_are_defined_values() {
        let normalized = normalize(&rules(Rules::new().device(Device::Phone, 0)));
        assert_eq!(normalized.devices.desktop, Some(0));

        let normalized = normalize(&rules(Rules::new().mobile(false)));
        assert_eq!(normalized.devices.tablet, Some(false));
    }

    #[test]
    fn queries_pass_through_in_declaration_order() {
        let normalized = normalize(&rules(
            Rules::new()
                .when("(max-width: 800px)", 1)
                .when("(max-width: 1200px)", 2),
        ));
        assert_eq!(normalized.devices, DeviceValues::default());
        assert_eq!(
            normalized.query_keys(),
            [Query::new("(max-width: 800px)"), Query::new("(max-width: 1200px)")]
        );
        assert_eq!(normalized.query_value(&Query::new("(max-width: 1200px)")), Some(&2));
    }

    #[test]
    fn normalize_all_unions_queries_first_seen() {
        let a = rules(Rules::new().when("(x)", 1).when("(y)", 2));
        let b = rules(Rules::new().when("(y)", 3).when("(z)", 4));
        let c = ResponsiveValue::plain(5);
        let set = normalize_all([("a", &a), ("b", &b), ("c", &c)]);
        assert_eq!(
            set.queries,
            [Query::new("(x)"), Query::new("(y)"), Query::new("(z)")]
        );
        let keys: Vec<&str> = set.entries.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, ["a", "b", "c"]);
    }
}
