//! Managed package definitions.

use regex::Regex;
use serde::Deserialize;

use crate::asset::AssetFilter;
use crate::error::ConfigError;
use crate::provider::RepoId;
use crate::runtime::CommandLine;

use super::command::DEFAULT_PACKAGE_TYPE;

pub const DEFAULT_VERSION_COMMAND: &str = "{package_name} --version";
pub const DEFAULT_ASSET_FILTER: &str = "*.deb";
const PACKAGE_NAME_PLACEHOLDER: &str = "{package_name}";

/// A package entry as written in the configuration file.
///
/// Both the current key names and the ones used by earlier `repos.json`
/// files are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPackageSpec {
    pub owner: String,
    pub repo: String,
    pub package_name: String,
    #[serde(default)]
    pub version_command: Option<String>,
    #[serde(default, alias = "version_result_regular_expression")]
    pub version_result_pattern: Option<String>,
    #[serde(default)]
    pub package_type: Option<String>,
    #[serde(default, alias = "asset_pattern")]
    pub release_asset_filter: Option<String>,
    #[serde(default)]
    pub include_prerelease: bool,
}

/// How the installed version is extracted from the probe output.
#[derive(Debug, Clone)]
pub enum VersionPattern {
    /// Second whitespace separated token, e.g. `thorium 126.0.6478.231`.
    SecondToken,
    /// First capture group if the expression has one, whole match otherwise.
    Regex(Regex),
}

impl VersionPattern {
    pub fn extract(&self, output: &str) -> Option<String> {
        match self {
            VersionPattern::SecondToken => output.split_whitespace().nth(1).map(String::from),
            VersionPattern::Regex(re) => {
                let captures = re.captures(output)?;
                let found = match captures.get(1) {
                    Some(group) => group.as_str(),
                    None => captures.get(0)?.as_str(),
                };
                let found = found.trim();
                (!found.is_empty()).then(|| found.to_string())
            }
        }
    }
}

/// A validated package definition; immutable for the whole run.
#[derive(Debug, Clone)]
pub struct PackageSpec {
    pub repo: RepoId,
    pub package_name: String,
    pub version_command: String,
    pub version_pattern: VersionPattern,
    pub package_type: String,
    pub asset_filter: AssetFilter,
    pub include_prerelease: bool,
}

impl PackageSpec {
    /// The probe command with `{package_name}` substituted.
    pub fn probe_command(&self) -> CommandLine {
        let mut args = self
            .version_command
            .split_whitespace()
            .map(|arg| arg.replace(PACKAGE_NAME_PLACEHOLDER, &self.package_name));
        let program = args.next().unwrap_or_default();
        CommandLine::new(program, args.collect())
    }
}

impl TryFrom<RawPackageSpec> for PackageSpec {
    type Error = ConfigError;

    fn try_from(raw: RawPackageSpec) -> Result<Self, Self::Error> {
        let package = raw.package_name.trim().to_string();
        let non_empty = |value: &str, field: &'static str| {
            if value.trim().is_empty() {
                Err(ConfigError::EmptyField {
                    package: package.clone(),
                    field,
                })
            } else {
                Ok(())
            }
        };

        non_empty(&raw.package_name, "package_name")?;
        non_empty(&raw.owner, "owner")?;
        non_empty(&raw.repo, "repo")?;

        let version_command = raw
            .version_command
            .unwrap_or_else(|| DEFAULT_VERSION_COMMAND.to_string());
        non_empty(&version_command, "version_command")?;

        let package_type = raw
            .package_type
            .unwrap_or_else(|| DEFAULT_PACKAGE_TYPE.to_string());
        non_empty(&package_type, "package_type")?;

        let version_pattern = match raw.version_result_pattern {
            Some(pattern) => VersionPattern::Regex(Regex::new(&pattern).map_err(|source| {
                ConfigError::InvalidVersionPattern {
                    package: package.clone(),
                    pattern,
                    source,
                }
            })?),
            None => VersionPattern::SecondToken,
        };

        let filter = raw
            .release_asset_filter
            .unwrap_or_else(|| DEFAULT_ASSET_FILTER.to_string());
        non_empty(&filter, "release_asset_filter")?;
        let asset_filter =
            AssetFilter::new(&filter).map_err(|source| ConfigError::InvalidAssetFilter {
                package: package.clone(),
                filter: filter.clone(),
                source,
            })?;

        Ok(PackageSpec {
            repo: RepoId::new(raw.owner.trim(), raw.repo.trim()),
            package_name: package,
            version_command,
            version_pattern,
            package_type,
            asset_filter,
            include_prerelease: raw.include_prerelease,
        })
    }
}
