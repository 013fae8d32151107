#![forbid(unsafe_code)]

//! Canonical device classes.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// One of the three canonical screen-size classes a responsive value can
/// vary by.
///
/// `Device` is the *output* vocabulary of normalization. Rule maps may
/// additionally use the legacy `mobile` alias on input; it participates in
/// fallback only and never appears in normalized output (see
/// [`Rules::mobile`](crate::Rules::mobile)).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Device {
    Phone,
    Tablet,
    Desktop,
}

impl Device {
    /// All canonical devices.
    pub const ALL: [Self; 3] = [Self::Phone, Self::Tablet, Self::Desktop];

    /// The lowercase tag used as a rule-map key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The string was not a canonical device tag.
///
/// Note that `mobile` is deliberately not parseable here: it is an
/// input-only alias, not a canonical device.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown device tag: {0:?}")]
pub struct UnknownDevice(pub String);

impl FromStr for Device {
    type Err = UnknownDevice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "phone" => Ok(Self::Phone),
            "tablet" => Ok(Self::Tablet),
            "desktop" => Ok(Self::Desktop),
            other => Err(UnknownDevice(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrip() {
        for device in Device::ALL {
            assert_eq!(device.as_str().parse::<Device>(), Ok(device));
        }
    }

    #[test]
    fn mobile_is_not_canonical() {
        assert_eq!(
            "mobile".parse::<Device>(),
            Err(UnknownDevice("mobile".to_owned()))
        );
    }

    #[test]
    fn unknown_tag_error_names_the_input() {
        let err = "watch".parse::<Device>().unwrap_err();
        assert_eq!(err.to_string(), "unknown device tag: \"watch\"");
    }
}
