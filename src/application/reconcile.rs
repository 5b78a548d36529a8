//! Reconciliation of one package: probe, resolve, decide.

use std::time::Duration;

use log::{debug, warn};

use crate::error::PackageError;
use crate::package::{Decision, Mode, PackageSpec, VersionPair, decide, decide_removal};
use crate::provider::ReleaseSource;
use crate::runtime::Runtime;

use super::probe::installed_version;
use super::resolve::{ReleaseResolver, ResolvedRelease};

/// Outcome of reconciling one package, before anything is executed.
#[derive(Debug, Clone)]
pub struct Plan {
    pub decision: Decision,
    pub installed: Option<String>,
    /// Absent in remove mode, where the remote side is never queried.
    pub release: Option<ResolvedRelease>,
}

impl Plan {
    /// The release to download, if the decision needs one.
    pub fn download(&self) -> Option<&ResolvedRelease> {
        self.release
            .as_ref()
            .filter(|_| self.decision.download_required)
    }
}

pub struct Reconciler<'a, R: Runtime, S: ReleaseSource + ?Sized> {
    runtime: &'a R,
    resolver: ReleaseResolver<'a, S>,
    probe_timeout: Duration,
}

impl<'a, R: Runtime, S: ReleaseSource + ?Sized> Reconciler<'a, R, S> {
    pub fn new(runtime: &'a R, source: &'a S, probe_timeout: Duration) -> Self {
        Self {
            runtime,
            resolver: ReleaseResolver::new(source),
            probe_timeout,
        }
    }

    #[tracing::instrument(skip(self, spec), fields(package = %spec.package_name))]
    pub async fn reconcile(&self, spec: &PackageSpec, mode: Mode) -> Result<Plan, PackageError> {
        let installed = installed_version(self.runtime, spec, self.probe_timeout).await;
        debug!("{}: installed version {:?}", spec.package_name, installed);

        if mode == Mode::Remove {
            return Ok(Plan {
                decision: decide_removal(installed.as_deref()),
                installed,
                release: None,
            });
        }

        println!("   resolving {}", spec.repo);
        let release = self.resolver.resolve(spec).await?;

        let decision = decide(
            mode,
            &VersionPair {
                installed: installed.clone(),
                remote: release.remote_version.clone(),
            },
        );
        if let Some(warning) = &decision.warning {
            warn!("{}: {}", spec.package_name, warning);
        }
        debug!("{}: {} -> {}", spec.package_name, mode, decision.action);

        Ok(Plan {
            decision,
            installed,
            release: Some(release),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{Action, RawPackageSpec};
    use crate::provider::{MockReleaseSource, Release, ReleaseAsset};
    use crate::runtime::{CommandOutput, MockRuntime};

    fn spec() -> PackageSpec {
        let raw: RawPackageSpec = serde_json::from_str(
            r#"{"owner": "o", "repo": "app", "package_name": "app", "release_asset_filter": "app_*.deb"}"#,
        )
        .unwrap();
        PackageSpec::try_from(raw).unwrap()
    }

    fn runtime_with_probe(code: i32, stdout: &'static str) -> MockRuntime {
        let mut runtime = MockRuntime::new();
        runtime.expect_capture().returning(move |_, _| {
            Ok(CommandOutput {
                code: Some(code),
                stdout: stdout.to_string(),
                stderr: String::new(),
            })
        });
        runtime
    }

    fn source_with_tag(tag: &'static str) -> MockReleaseSource {
        let mut source = MockReleaseSource::new();
        source.expect_latest_release().returning(move |_| {
            Ok(Release {
                tag: tag.to_string(),
                assets: vec![ReleaseAsset {
                    name: "app_1.0.deb".into(),
                    size: 1,
                    download_url: "https://example.com/app_1.0.deb".into(),
                }],
                ..Default::default()
            })
        });
        source
    }

    #[tokio::test]
    async fn test_probe_failure_installs() {
        let runtime = runtime_with_probe(1, "");
        let source = source_with_tag("v1.0");

        let plan = Reconciler::new(&runtime, &source, Duration::from_secs(1))
            .reconcile(&spec(), Mode::Install)
            .await
            .unwrap();

        assert_eq!(plan.decision.action, Action::Install);
        assert!(plan.decision.download_required);
        assert_eq!(plan.download().unwrap().asset.name, "app_1.0.deb");
    }

    #[tokio::test]
    async fn test_same_version_with_prefixed_tag_is_noop() {
        let runtime = runtime_with_probe(0, "app 2.1.0");
        let source = source_with_tag("v2.1.0");

        let plan = Reconciler::new(&runtime, &source, Duration::from_secs(1))
            .reconcile(&spec(), Mode::Update)
            .await
            .unwrap();

        assert!(plan.decision.is_noop());
        assert_eq!(plan.installed.as_deref(), Some("2.1.0"));
        assert!(plan.download().is_none());
    }

    #[tokio::test]
    async fn test_update_when_remote_is_newer() {
        let runtime = runtime_with_probe(0, "app 1.0");
        let source = source_with_tag("v1.1");

        let plan = Reconciler::new(&runtime, &source, Duration::from_secs(1))
            .reconcile(&spec(), Mode::Update)
            .await
            .unwrap();

        assert_eq!(plan.decision.action, Action::Update);
        assert!(plan.download().is_some());
    }

    #[tokio::test]
    async fn test_remove_does_not_query_remote() {
        let runtime = runtime_with_probe(0, "app 1.0");
        let mut source = MockReleaseSource::new();
        source.expect_latest_release().never();
        source.expect_releases().never();

        let plan = Reconciler::new(&runtime, &source, Duration::from_secs(1))
            .reconcile(&spec(), Mode::Remove)
            .await
            .unwrap();

        assert_eq!(plan.decision.action, Action::Remove);
        assert!(plan.release.is_none());
        assert!(plan.download().is_none());
    }

    #[tokio::test]
    async fn test_remove_not_installed_is_noop() {
        let runtime = runtime_with_probe(127, "");
        let source = MockReleaseSource::new();

        let plan = Reconciler::new(&runtime, &source, Duration::from_secs(1))
            .reconcile(&spec(), Mode::Remove)
            .await
            .unwrap();

        assert!(plan.decision.is_noop());
    }

    #[tokio::test]
    async fn test_incomparable_versions_update_with_warning() {
        let runtime = runtime_with_probe(0, "app beta");
        let source = source_with_tag("v1.0");

        let plan = Reconciler::new(&runtime, &source, Duration::from_secs(1))
            .reconcile(&spec(), Mode::Update)
            .await
            .unwrap();

        assert_eq!(plan.decision.action, Action::Update);
        assert!(plan.decision.warning.is_some());
    }
}
