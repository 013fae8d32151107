#![forbid(unsafe_code)]

//! Responsive value inputs: opaque queries, rule maps, and the
//! value-or-rules enum.
//!
//! # Classification
//!
//! A raw string key belongs in a rule map iff it is one of the four
//! device/alias tags or is wrapped in parentheses (a viewport query).
//! Anything else makes the whole input non-responsive; that permissive
//! degrade lives at the untyped boundaries ([`Rules::from_entries`] and the
//! serde repr) so plain values flow through the same path as responsive
//! ones.

use std::fmt;

use crate::device::Device;

/// An opaque viewport query, keyed by its literal string form, e.g.
/// `(max-width: 800px)`.
///
/// Queries are never parsed beyond the surrounding parentheses; the
/// platform owns their semantics.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Query(String);

impl Query {
    /// Wrap a raw query string verbatim.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The literal query string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `key` carries the `( … )` wrapper that marks a rule-map key
    /// as a query rather than a device tag.
    #[must_use]
    pub fn is_query_key(key: &str) -> bool {
        key.len() >= 2 && key.starts_with('(') && key.ends_with(')')
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Query {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Query {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

/// Input-only rule slot: the three canonical devices plus the legacy
/// `mobile` alias. Normalization fallback chains are expressed over slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Slot {
    Mobile,
    Phone,
    Tablet,
    Desktop,
}

/// Per-device and per-query rules for one responsive value.
///
/// Device slots are fixed; query rules keep their declaration order, which
/// is the priority order at resolution time. A duplicate query key keeps
/// its first position and takes the last value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rules<T> {
    mobile: Option<T>,
    phone: Option<T>,
    tablet: Option<T>,
    desktop: Option<T>,
    queries: Vec<(Query, T)>,
}

impl<T> Default for Rules<T> {
    fn default() -> Self {
        Self {
            mobile: None,
            phone: None,
            tablet: None,
            desktop: None,
            queries: Vec::new(),
        }
    }
}

impl<T> Rules<T> {
    /// An empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rule for a canonical device.
    #[must_use]
    pub fn device(mut self, device: Device, value: T) -> Self {
        match device {
            Device::Phone => self.phone = Some(value),
            Device::Tablet => self.tablet = Some(value),
            Device::Desktop => self.desktop = Some(value),
        }
        self
    }

    /// Set the legacy `mobile` alias rule.
    ///
    /// The alias covers `phone` and `tablet` with the lowest priority;
    /// normalization warns when it collides with an explicit rule for
    /// either.
    #[must_use]
    pub fn mobile(mut self, value: T) -> Self {
        self.mobile = Some(value);
        self
    }

    /// Append a query rule. Later rules lose to earlier ones at resolution
    /// time.
    #[must_use]
    pub fn when(mut self, query: impl Into<Query>, value: T) -> Self {
        self.set_query(query.into(), value);
        self
    }

    /// Build a rule set from raw string-keyed entries, applying the
    /// permissive classification: returns `None` when any key is neither a
    /// device/alias tag nor a parenthesized query, in which case the caller
    /// should treat the whole input as a plain value.
    pub fn from_entries<K, I>(entries: I) -> Option<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, T)>,
    {
        let mut rules = Self::new();
        for (key, value) in entries {
            if !rules.insert_entry(key.as_ref(), value) {
                return None;
            }
        }
        Some(rules)
    }

    /// The rule for a canonical device, if set.
    #[must_use]
    pub fn device_value(&self, device: Device) -> Option<&T> {
        match device {
            Device::Phone => self.phone.as_ref(),
            Device::Tablet => self.tablet.as_ref(),
            Device::Desktop => self.desktop.as_ref(),
        }
    }

    /// The legacy `mobile` alias rule, if set.
    #[must_use]
    pub fn mobile_value(&self) -> Option<&T> {
        self.mobile.as_ref()
    }

    /// Query rules in declaration order.
    #[must_use]
    pub fn queries(&self) -> &[(Query, T)] {
        &self.queries
    }

    /// Whether no rule at all is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mobile.is_none()
            && self.phone.is_none()
            && self.tablet.is_none()
            && self.desktop.is_none()
            && self.queries.is_empty()
    }

    pub(crate) fn slot(&self, slot: Slot) -> Option<&T> {
        match slot {
            Slot::Mobile => self.mobile.as_ref(),
            Slot::Phone => self.phone.as_ref(),
            Slot::Tablet => self.tablet.as_ref(),
            Slot::Desktop => self.desktop.as_ref(),
        }
    }

    /// Classify one raw key and insert its value. Returns `false` when the
    /// key is neither a device/alias tag nor a parenthesized query.
    fn insert_entry(&mut self, key: &str, value: T) -> bool {
        match key {
            "mobile" => self.mobile = Some(value),
            "phone" => self.phone = Some(value),
            "tablet" => self.tablet = Some(value),
            "desktop" => self.desktop = Some(value),
            _ if Query::is_query_key(key) => self.set_query(Query::new(key), value),
            _ => return false,
        }
        true
    }

    fn set_query(&mut self, query: Query, value: T) {
        if let Some(existing) = self.queries.iter_mut().find(|(q, _)| *q == query) {
            existing.1 = value;
        } else {
            self.queries.push((query, value));
        }
    }
}

/// A value that may vary per device class or per viewport query.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ResponsiveValue<T> {
    /// A rule map. Listed before [`Plain`](Self::Plain): the untagged serde
    /// repr tries variants in order, and the bare-value arm would otherwise
    /// absorb rule maps whenever `T` itself deserializes from maps.
    Rules(Rules<T>),
    /// A bare value, applied to every device.
    Plain(T),
}

impl<T> ResponsiveValue<T> {
    /// A bare value.
    #[must_use]
    pub fn plain(value: T) -> Self {
        Self::Plain(value)
    }
}

impl<T> From<Rules<T>> for ResponsiveValue<T> {
    fn from(rules: Rules<T>) -> Self {
        Self::Rules(rules)
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use std::fmt;
    use std::marker::PhantomData;

    use serde::de::{self, MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Rules;

    impl<T: Serialize> Serialize for Rules<T> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let slots = [
                ("phone", &self.phone),
                ("tablet", &self.tablet),
                ("desktop", &self.desktop),
                ("mobile", &self.mobile),
            ];
            let len =
                slots.iter().filter(|(_, v)| v.is_some()).count() + self.queries.len();
            let mut map = serializer.serialize_map(Some(len))?;
            for (key, value) in slots {
                if let Some(value) = value {
                    map.serialize_entry(key, value)?;
                }
            }
            for (query, value) in &self.queries {
                map.serialize_entry(query.as_str(), value)?;
            }
            map.end()
        }
    }

    impl<'de, T: Deserialize<'de>> Deserialize<'de> for Rules<T> {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            struct RulesVisitor<T>(PhantomData<T>);

            impl<'de, T: Deserialize<'de>> Visitor<'de> for RulesVisitor<T> {
                type Value = Rules<T>;

                fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str("a map of device tags and parenthesized query keys")
                }

                fn visit_map<A: MapAccess<'de>>(
                    self,
                    mut access: A,
                ) -> Result<Self::Value, A::Error> {
                    let mut rules = Rules::new();
                    while let Some(key) = access.next_key::<String>()? {
                        let value = access.next_value::<T>()?;
                        if !rules.insert_entry(&key, value) {
                            return Err(de::Error::custom(format_args!(
                                "unrecognized responsive key `{key}`"
                            )));
                        }
                    }
                    Ok(rules)
                }
            }

            deserializer.deserialize_map(RulesVisitor(PhantomData))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_key_classification() {
        assert!(Query::is_query_key("(max-width: 800px)"));
        assert!(Query::is_query_key("()"));
        assert!(!Query::is_query_key("max-width: 800px"));
        assert!(!Query::is_query_key("(unclosed"));
        assert!(!Query::is_query_key("("));
        assert!(!Query::is_query_key(""));
    }

    #[test]
    fn from_entries_accepts_a_single_device() {
        let rules = Rules::from_entries([("desktop", 1)]).unwrap();
        assert_eq!(rules.device_value(Device::Desktop), Some(&1));
        assert!(rules.queries().is_empty());
    }

    #[test]
    fn from_entries_accepts_all_devices() {
        let rules =
            Rules::from_entries([("desktop", 1), ("mobile", 1), ("tablet", 1), ("phone", 1)])
                .unwrap();
        assert_eq!(rules.mobile_value(), Some(&1));
        assert_eq!(rules.device_value(Device::Phone), Some(&1));
    }

    #[test]
    fn from_entries_accepts_queries_alongside_devices() {
        let rules = Rules::from_entries([
            ("tablet", 1),
            ("(max-width: 100px)", 1),
            ("(max-width: 300px)", 2),
        ])
        .unwrap();
        assert_eq!(rules.queries().len(), 2);
        assert_eq!(rules.queries()[0].0.as_str(), "(max-width: 100px)");
    }

    #[test]
    fn from_entries_rejects_extraneous_keys() {
        let entries = [
            ("desktop", 1),
            ("mobile", 1),
            ("oops", 0),
            ("max-width: 300px", 0),
        ];
        assert_eq!(Rules::from_entries(entries), None);
    }

    #[test]
    fn duplicate_query_keeps_first_position_and_last_value() {
        let rules = Rules::new()
            .when("(a)", 1)
            .when("(b)", 2)
            .when("(a)", 3);
        assert_eq!(
            rules.queries(),
            &[(Query::new("(a)"), 3), (Query::new("(b)"), 2)]
        );
    }

    #[test]
    fn builder_preserves_query_order() {
        let rules = Rules::new()
            .device(Device::Desktop, 0)
            .when("(min-width: 1200px)", 1)
            .when("(max-width: 600px)", 2);
        let keys: Vec<&str> = rules.queries().iter().map(|(q, _)| q.as_str()).collect();
        assert_eq!(keys, ["(min-width: 1200px)", "(max-width: 600px)"]);
    }

    #[test]
    fn empty_rules_are_empty() {
        assert!(Rules::<i32>::new().is_empty());
        assert!(!Rules::new().mobile(1).is_empty());
    }
}
