//! Release sources.
//!
//! This module defines the release model shared by the resolver and the
//! dispatcher, and the [`ReleaseSource`] trait through which releases are
//! fetched. GitHub is the only implementation.

mod github;

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

pub use github::{DEFAULT_API_URL, GitHubProvider};

/// Repository identifier (owner/repo format).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReleaseAsset {
    pub name: String,
    /// Size in bytes as reported by the API, `0` when unknown.
    pub size: u64,
    pub download_url: String,
}

/// A published release.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Release {
    /// Version tag (e.g., "v1.0.0")
    pub tag: String,
    /// Publication date (ISO 8601)
    pub published_at: Option<String>,
    pub prerelease: bool,
    pub draft: bool,
    pub assets: Vec<ReleaseAsset>,
}

/// Where releases come from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// The most recent stable release. Drafts and pre-releases are never returned.
    async fn latest_release(&self, repo: &RepoId) -> Result<Release>;

    /// All releases, newest first, including pre-releases.
    async fn releases(&self, repo: &RepoId) -> Result<Vec<Release>>;
}
