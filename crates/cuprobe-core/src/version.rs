//! Toolkit and tool version numbers.
//!
//! Toolkit compatibility is decided on the *release* (`major.minor`) while
//! tools report a full `major.minor.patch`. The two are never compared
//! without an explicit [`Version::release`] truncation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A `major.minor.patch` version with total ordering.
///
/// Field order matters: the derived `Ord` compares major, then minor, then
/// patch, so `1.2.0 < 1.10.0 < 2.0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

/// Error returned when a version string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version string: {0:?}")]
pub struct VersionParseError(pub String);

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// A release version (`major.minor`, patch zero).
    pub const fn release_of(major: u32, minor: u32) -> Self {
        Self::new(major, minor, 0)
    }

    /// Truncate to `major.minor`.
    pub const fn release(self) -> Self {
        Self::release_of(self.major, self.minor)
    }

    /// Whether two versions belong to the same `major.minor` release.
    pub fn same_release(self, other: Self) -> bool {
        self.release() == other.release()
    }

    /// `major.minor` rendering, used wherever a release is shown.
    pub fn release_string(self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Parse the leading digits of a component, so `0-rc1` reads as `0`.
fn leading_number(part: &str) -> Option<u32> {
    let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

impl FromStr for Version {
    type Err = VersionParseError;

    /// Accepts `12`, `12.4`, `12.4.131` and a leading `v`/`V`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        let mut parts = body.split('.');
        let major = parts
            .next()
            .and_then(leading_number)
            .ok_or_else(|| VersionParseError(s.to_string()))?;
        let minor = match parts.next() {
            Some(part) => leading_number(part).ok_or_else(|| VersionParseError(s.to_string()))?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(part) => leading_number(part).ok_or_else(|| VersionParseError(s.to_string()))?,
            None => 0,
        };

        Ok(Self::new(major, minor, patch))
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

impl TryFrom<String> for Version {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
