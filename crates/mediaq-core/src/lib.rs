#![forbid(unsafe_code)]

//! Core data model and normalization for responsive values.
//!
//! A *responsive value* is either a bare value or a map of rules keyed by
//! device tags (`phone`, `tablet`, `desktop`, plus the legacy `mobile`
//! alias) and parenthesized viewport queries such as `(max-width: 800px)`.
//! [`normalize`] turns any such input into the canonical [`Normalized`]
//! form: one optional slot per canonical device, filled via a deterministic
//! fallback chain, plus the query rules in declaration order.
//!
//! Live query evaluation and resolution live in the companion crates;
//! everything here is pure and synchronous apart from an advisory `tracing`
//! warning when the `mobile` alias collides with an explicit `phone` or
//! `tablet` rule.

pub mod device;
pub mod normalize;
pub mod value;

pub use device::{Device, UnknownDevice};
pub use normalize::{DeviceValues, Normalized, NormalizedSet, normalize, normalize_all};
pub use value::{Query, ResponsiveValue, Rules};
