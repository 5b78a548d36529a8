//! Version parsing and ordering.
//!
//! Release tags and `--version` output rarely follow strict semver, so
//! versions are compared component by component and an ordering that cannot
//! be decided is reported as [`VersionComparison::Incomparable`] instead of
//! being guessed.

use std::cmp::Ordering;
use std::fmt;

use crate::error::VersionFormatError;

/// One `.` or `-` separated piece of a version string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    Numeric(u64),
    Text(String),
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Numeric(n) => write!(f, "{}", n),
            Component::Text(s) => f.write_str(s),
        }
    }
}

/// Result of parsing a version string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedVersion {
    /// Components with trailing numeric zeros removed, so `1.0` and `1.0.0`
    /// normalize identically.
    Parsed(Vec<Component>),
    Unparseable,
}

impl ParsedVersion {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() {
            return ParsedVersion::Unparseable;
        }

        let mut components = Vec::new();
        for part in input.split(['.', '-']) {
            if part.is_empty() {
                return ParsedVersion::Unparseable;
            }
            let component = if part.bytes().all(|b| b.is_ascii_digit()) {
                match part.parse::<u64>() {
                    Ok(n) => Component::Numeric(n),
                    Err(_) => return ParsedVersion::Unparseable,
                }
            } else {
                Component::Text(part.to_string())
            };
            components.push(component);
        }

        while components.last() == Some(&Component::Numeric(0)) {
            components.pop();
        }

        ParsedVersion::Parsed(components)
    }
}

/// Outcome of comparing two versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionComparison {
    Less,
    Equal,
    Greater,
    Incomparable(VersionFormatError),
}

impl VersionComparison {
    fn from_ordering(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => VersionComparison::Less,
            Ordering::Equal => VersionComparison::Equal,
            Ordering::Greater => VersionComparison::Greater,
        }
    }
}

/// Compare two version strings.
///
/// Numeric components compare numerically, text components compare as
/// strings. Missing trailing components count as numeric zero. A numeric
/// component facing a text component makes the pair incomparable.
pub fn compare(left: &str, right: &str) -> VersionComparison {
    let left_components = match ParsedVersion::parse(left) {
        ParsedVersion::Parsed(c) => c,
        ParsedVersion::Unparseable => {
            return VersionComparison::Incomparable(VersionFormatError::Unparseable(
                left.to_string(),
            ));
        }
    };
    let right_components = match ParsedVersion::parse(right) {
        ParsedVersion::Parsed(c) => c,
        ParsedVersion::Unparseable => {
            return VersionComparison::Incomparable(VersionFormatError::Unparseable(
                right.to_string(),
            ));
        }
    };

    static ZERO: Component = Component::Numeric(0);
    let len = left_components.len().max(right_components.len());

    for position in 0..len {
        let l = left_components.get(position).unwrap_or(&ZERO);
        let r = right_components.get(position).unwrap_or(&ZERO);

        let ordering = match (l, r) {
            (Component::Numeric(a), Component::Numeric(b)) => a.cmp(b),
            (Component::Text(a), Component::Text(b)) => a.cmp(b),
            _ => {
                return VersionComparison::Incomparable(VersionFormatError::MixedComponents {
                    left: left.to_string(),
                    right: right.to_string(),
                    position,
                    left_component: l.to_string(),
                    right_component: r.to_string(),
                });
            }
        };

        if ordering != Ordering::Equal {
            return VersionComparison::from_ordering(ordering);
        }
    }

    VersionComparison::Equal
}

/// Strip the leading non-numeric prefix of a release tag (`v2.1.0` -> `2.1.0`).
///
/// A tag without any digit is returned unchanged.
pub fn normalize_tag(tag: &str) -> &str {
    let trimmed = tag.trim();
    match trimmed.find(|c: char| c.is_ascii_digit()) {
        Some(start) => &trimmed[start..],
        None => trimmed,
    }
}
