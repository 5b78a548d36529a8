//! Error types that callers branch on.
//!
//! `ConfigError` aborts a run before any package is touched. `PackageError`
//! is scoped to one package: it is recorded in the run summary and the run
//! moves on to the next package.

use std::path::PathBuf;

use thiserror::Error;

/// Two versions could not be ordered against each other. Carried by an
/// incomparable comparison and reported as the decision's warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionFormatError {
    #[error("version '{0}' cannot be parsed")]
    Unparseable(String),

    #[error(
        "versions '{left}' and '{right}' differ in kind at component {position} ('{left_component}' vs '{right_component}')"
    )]
    MixedComponents {
        left: String,
        right: String,
        position: usize,
        left_component: String,
        right_component: String,
    },
}

/// Failure while reconciling or acting on a single package.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("no release asset matches '{filter}' (available: {})", display_names(.available))]
    NoMatchingAsset {
        filter: String,
        available: Vec<String>,
    },

    #[error("release asset filter '{filter}' is ambiguous, it matches: {}", .matches.join(", "))]
    AmbiguousAsset {
        filter: String,
        matches: Vec<String>,
    },

    #[error("failed to resolve the latest release of {repo}: {source:#}")]
    RemoteResolution {
        repo: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to download {url}: {source:#}")]
    Download {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("`{command}` {}", describe_exit(.code))]
    ActionExecution { command: String, code: Option<i32> },
}

/// The configuration cannot be used; nothing has been processed yet.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("malformed configuration in {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("package '{package}' uses package type '{package_type}', which has no commands")]
    MissingPackageType {
        package: String,
        package_type: String,
    },

    #[error("package '{0}' is configured more than once")]
    DuplicatePackage(String),

    #[error("package '{0}' is not configured")]
    UnknownPackage(String),

    #[error("package '{package}': field '{field}' must not be empty")]
    EmptyField {
        package: String,
        field: &'static str,
    },

    #[error("package '{package}': invalid version pattern '{pattern}': {source}")]
    InvalidVersionPattern {
        package: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("package '{package}': invalid asset filter '{filter}': {source}")]
    InvalidAssetFilter {
        package: String,
        filter: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("package type '{package_type}': {action} command must not be empty")]
    EmptyCommand {
        package_type: String,
        action: &'static str,
    },

    #[error("package type '{package_type}': {action} command has no {{package}} placeholder")]
    MissingPlaceholder {
        package_type: String,
        action: &'static str,
    },
}

fn display_names(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {}", code),
        None => "did not run to completion".to_string(),
    }
}
