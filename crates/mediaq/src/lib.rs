#![forbid(unsafe_code)]

//! mediaq public facade.
//!
//! Resolves responsive values (plain, per-device, or per-viewport-query)
//! into the one concrete value for the current environment, and keeps that
//! resolution live as the environment changes:
//!
//! ```
//! use mediaq::{Device, QueryStore, Resolver, ResponsiveValue, Rules, Unsupported};
//!
//! let mut resolver = Resolver::new(QueryStore::new(Unsupported));
//! let padding = ResponsiveValue::from(
//!     Rules::new()
//!         .device(Device::Phone, 8)
//!         .device(Device::Desktop, 24)
//!         .when("(max-width: 1000px)", 16),
//! );
//! // No query evaluation on this platform, so device fallback wins.
//! assert_eq!(resolver.resolve(&padding, Device::Desktop), Some(24));
//! assert_eq!(resolver.resolve(&padding, Device::Phone), Some(8));
//! ```

pub mod resolver;

pub use mediaq_core::{
    Device, DeviceValues, Normalized, NormalizedSet, Query, ResponsiveValue, Rules,
    UnknownDevice, normalize, normalize_all,
};
pub use mediaq_track::{
    Matcher, Platform, QueryStore, QueryTracker, Subscription, Unsupported, first_matching,
};
pub use resolver::{DeviceSource, Resolver};

pub mod prelude {
    pub use mediaq_core as core;
    pub use mediaq_track as track;

    pub use crate::resolver::{DeviceSource, Resolver};
    pub use mediaq_core::{Device, Query, ResponsiveValue, Rules};
    pub use mediaq_track::{QueryStore, Unsupported};
}
