use glob::{MatchOptions, Pattern, PatternError};

use crate::error::PackageError;
use crate::provider::ReleaseAsset;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Selects the single release asset a package installs from.
///
/// A filter containing glob metacharacters (`*`, `?`, `[`) must match the
/// whole file name; any other filter matches as a substring.
#[derive(Debug, Clone)]
pub struct AssetFilter {
    raw: String,
    pattern: Option<Pattern>,
}

impl AssetFilter {
    pub fn new(filter: &str) -> Result<Self, PatternError> {
        let pattern = if filter.contains(['*', '?', '[']) {
            Some(Pattern::new(filter)?)
        } else {
            None
        };
        Ok(Self {
            raw: filter.to_string(),
            pattern,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, name: &str) -> bool {
        match &self.pattern {
            Some(pattern) => pattern.matches_with(name, MATCH_OPTIONS),
            None => name.contains(&self.raw),
        }
    }

    /// Pick exactly one asset. Several matches are an error, never a first pick.
    pub fn select<'a>(&self, assets: &'a [ReleaseAsset]) -> Result<&'a ReleaseAsset, PackageError> {
        let mut matching = assets.iter().filter(|a| self.matches(&a.name));

        match (matching.next(), matching.next()) {
            (Some(asset), None) => Ok(asset),
            (None, _) => Err(PackageError::NoMatchingAsset {
                filter: self.raw.clone(),
                available: assets.iter().map(|a| a.name.clone()).collect(),
            }),
            (Some(first), Some(second)) => {
                let mut matches = vec![first.name.clone(), second.name.clone()];
                matches.extend(matching.map(|a| a.name.clone()));
                Err(PackageError::AmbiguousAsset {
                    filter: self.raw.clone(),
                    matches,
                })
            }
        }
    }
}
