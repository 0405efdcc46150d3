//! Version identifiers and the dotted-numeric comparator.
//!
//! Table and row versions are dotted strings such as `"1.2"` or `"2.10.1"`.
//! Segments compare numerically, so `"1.9"` is older than `"1.10"`. A bare
//! integer is normalized to `"N.0"` and absent trailing segments count as
//! zero, which makes `"2"`, `"2.0"` and `"2.0.0"` equal.
//!
//! [`Version::Missing`] marks a table that does not exist yet. It is older
//! than every real version, so a missing table is always due for creation.

use crate::error::{CoreError, CoreResult};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// Result of comparing two versions, read as "the left side is ... the right side".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOrder {
    /// Left version is older
    Older,
    /// Both versions denote the same release
    Equal,
    /// Left version is newer
    Newer,
}

impl From<Ordering> for VersionOrder {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => VersionOrder::Older,
            Ordering::Equal => VersionOrder::Equal,
            Ordering::Greater => VersionOrder::Newer,
        }
    }
}

impl From<VersionOrder> for Ordering {
    fn from(order: VersionOrder) -> Self {
        match order {
            VersionOrder::Older => Ordering::Less,
            VersionOrder::Equal => Ordering::Equal,
            VersionOrder::Newer => Ordering::Greater,
        }
    }
}

/// A table or row version.
#[derive(Debug, Clone)]
pub enum Version {
    /// The table (or row version) does not exist.
    Missing,
    /// A normalized dotted version string.
    Known(String),
}

impl Version {
    /// Parse a version string, normalizing bare integers to `"N.0"`.
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidVersion {
                value: raw.to_string(),
                reason: "version must not be empty".to_string(),
            });
        }
        if trimmed.split('.').any(|segment| segment.is_empty()) {
            return Err(CoreError::InvalidVersion {
                value: raw.to_string(),
                reason: "empty segment between dots".to_string(),
            });
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(CoreError::InvalidVersion {
                value: raw.to_string(),
                reason: "version must not contain whitespace".to_string(),
            });
        }

        if trimmed.chars().all(|c| c.is_ascii_digit()) {
            Ok(Version::Known(format!("{trimmed}.0")))
        } else {
            Ok(Version::Known(trimmed.to_string()))
        }
    }

    /// Build a version from a numeric literal, as found in JSON/YAML definitions.
    pub fn from_f64(value: f64) -> CoreResult<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(CoreError::InvalidVersion {
                value: value.to_string(),
                reason: "numeric versions must be finite and non-negative".to_string(),
            });
        }
        Self::parse(&value.to_string())
    }

    /// Whether this is the [`Version::Missing`] sentinel.
    pub fn is_missing(&self) -> bool {
        matches!(self, Version::Missing)
    }

    /// The normalized version string, or `None` for a missing version.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Version::Missing => None,
            Version::Known(s) => Some(s),
        }
    }

    /// Compare `self` against `other`.
    pub fn compare(&self, other: &Version) -> VersionOrder {
        compare(self, other)
    }

    /// `self` is strictly older than `other`.
    pub fn is_older(&self, other: &Version) -> bool {
        self.compare(other) == VersionOrder::Older
    }

    /// `self` is strictly newer than `other`.
    pub fn is_newer(&self, other: &Version) -> bool {
        self.compare(other) == VersionOrder::Newer
    }

    /// `self` is equal to or newer than `other`.
    pub fn not_older(&self, other: &Version) -> bool {
        !self.is_older(other)
    }

    /// `self` is equal to or older than `other`.
    pub fn not_newer(&self, other: &Version) -> bool {
        !self.is_newer(other)
    }
}

/// Compare two versions with dotted-numeric semantics.
pub fn compare(a: &Version, b: &Version) -> VersionOrder {
    match (a, b) {
        (Version::Missing, Version::Missing) => VersionOrder::Equal,
        (Version::Missing, Version::Known(_)) => VersionOrder::Older,
        (Version::Known(_), Version::Missing) => VersionOrder::Newer,
        (Version::Known(left), Version::Known(right)) => compare_dotted(left, right).into(),
    }
}

fn compare_dotted(left: &str, right: &str) -> Ordering {
    let mut lhs = left.split('.');
    let mut rhs = right.split('.');
    loop {
        match (lhs.next(), rhs.next()) {
            (None, None) => return Ordering::Equal,
            (l, r) => {
                let ord = compare_segment(l.unwrap_or("0"), r.unwrap_or("0"));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn compare_segment(left: &str, right: &str) -> Ordering {
    match (left.parse::<u64>(), right.parse::<u64>()) {
        (Ok(l), Ok(r)) => l.cmp(&r),
        _ => left.cmp(right),
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == VersionOrder::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other).into()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Missing => f.write_str("missing"),
            Version::Known(s) => f.write_str(s),
        }
    }
}

impl std::str::FromStr for Version {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Version::Missing => serializer.serialize_none(),
            Version::Known(s) => serializer.serialize_str(s),
        }
    }
}

struct VersionVisitor;

impl<'de> Visitor<'de> for VersionVisitor {
    type Value = Version;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a version string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Version, E> {
        Version::parse(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Version, E> {
        Version::parse(&v.to_string()).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Version, E> {
        if v < 0 {
            return Err(E::custom("versions must not be negative"));
        }
        Version::parse(&v.to_string()).map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Version, E> {
        Version::from_f64(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(VersionVisitor)
    }
}

#[cfg(test)]
#[path = "version_test.rs"]
mod tests;
