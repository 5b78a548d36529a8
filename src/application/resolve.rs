//! Release resolution: latest release of a repository plus the asset to fetch.

use anyhow::anyhow;
use log::debug;

use crate::error::PackageError;
use crate::package::{PackageSpec, normalize_tag};
use crate::provider::{Release, ReleaseAsset, ReleaseSource, RepoId};

/// The remote side of a reconciliation. Lives for one run only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRelease {
    /// Tag with its leading non-numeric prefix removed.
    pub remote_version: String,
    pub tag: String,
    pub asset: ReleaseAsset,
}

pub struct ReleaseResolver<'a, S: ReleaseSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: ReleaseSource + ?Sized> ReleaseResolver<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    #[tracing::instrument(skip(self, spec), fields(repo = %spec.repo))]
    pub async fn resolve(&self, spec: &PackageSpec) -> Result<ResolvedRelease, PackageError> {
        let release = self
            .latest(&spec.repo, spec.include_prerelease)
            .await
            .map_err(|source| PackageError::RemoteResolution {
                repo: spec.repo.to_string(),
                source,
            })?;

        debug!(
            "Latest release of {} is {}{} ({} assets)",
            spec.repo,
            release.tag,
            if release.prerelease { ", a pre-release" } else { "" },
            release.assets.len()
        );

        let asset = spec.asset_filter.select(&release.assets)?.clone();

        Ok(ResolvedRelease {
            remote_version: normalize_tag(&release.tag).to_string(),
            tag: release.tag,
            asset,
        })
    }

    async fn latest(&self, repo: &RepoId, include_prerelease: bool) -> anyhow::Result<Release> {
        if !include_prerelease {
            return self.source.latest_release(repo).await;
        }

        newest_published(self.source.releases(repo).await?)
            .ok_or_else(|| anyhow!("{} has no published releases", repo))
    }
}

/// Most recently published non-draft release. Releases without a
/// publication date sort last; ties go to the first listed (newest).
fn newest_published(releases: Vec<Release>) -> Option<Release> {
    releases
        .into_iter()
        .filter(|r| !r.draft)
        .reduce(|best, candidate| {
            if candidate.published_at > best.published_at {
                candidate
            } else {
                best
            }
        })
}
