//! Run use case - reconciles every selected package in turn.

use std::fmt;
use std::time::Duration;

use log::error;

use crate::cleanup::SharedCleanupContext;
use crate::error::{ConfigError, PackageError};
use crate::http::HttpClient;
use crate::package::{
    Action, Manifest, Mode, PackageCommandSet, PackageSpec, VersionComparison, compare,
};
use crate::provider::ReleaseSource;
use crate::runtime::Runtime;

use super::dispatch::{Dispatcher, planned_command};
use super::reconcile::{Plan, Reconciler};

/// Options for one run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: Mode,
    /// Print what would be done without downloading or executing anything
    pub dry_run: bool,
    pub probe_timeout: Duration,
    /// `None` lets package-manager commands run as long as they need
    pub action_timeout: Option<Duration>,
}

#[derive(Debug)]
pub enum OutcomeStatus {
    Succeeded {
        action: Action,
        version: Option<String>,
    },
    Skipped {
        reason: String,
    },
    /// Dry run: what would have been executed
    Planned {
        action: Action,
        command: String,
    },
    Failed(PackageError),
}

#[derive(Debug)]
pub struct PackageOutcome {
    pub package: String,
    pub status: OutcomeStatus,
}

impl fmt::Display for PackageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            OutcomeStatus::Succeeded { action, version } => {
                write!(f, "{:>12} {}", past_tense(*action), self.package)?;
                if let Some(version) = version {
                    write!(f, " {}", version)?;
                }
                Ok(())
            }
            OutcomeStatus::Skipped { reason } => {
                write!(f, "{:>12} {}: {}", "skipped", self.package, reason)
            }
            OutcomeStatus::Planned { action, command } => {
                write!(f, "{:>12} {} {}: `{}`", "would", action, self.package, command)
            }
            OutcomeStatus::Failed(e) => write!(f, "{:>12} {}: {}", "failed", self.package, e),
        }
    }
}

fn past_tense(action: Action) -> &'static str {
    match action {
        Action::Install => "installed",
        Action::Update => "updated",
        Action::Remove => "removed",
        Action::NoOp => "unchanged",
    }
}

/// Per-package outcomes of one run, in processing order.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<PackageOutcome>,
}

impl RunSummary {
    fn count(&self, predicate: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.status)).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Succeeded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Skipped { .. }))
    }

    pub fn planned(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Planned { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Failed(_)))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} skipped, {} failed",
            self.succeeded(),
            self.skipped(),
            self.failed()
        )?;
        if self.planned() > 0 {
            write!(f, ", {} planned", self.planned())?;
        }
        Ok(())
    }
}

pub struct RunUseCase<'a, R: Runtime, S: ReleaseSource + ?Sized> {
    reconciler: Reconciler<'a, R, S>,
    dispatcher: Dispatcher<'a, R>,
}

impl<'a, R: Runtime, S: ReleaseSource + ?Sized> RunUseCase<'a, R, S> {
    pub fn new(
        runtime: &'a R,
        source: &'a S,
        http_client: &'a HttpClient,
        cleanup: SharedCleanupContext,
        options: &RunOptions,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(runtime, source, options.probe_timeout),
            dispatcher: Dispatcher::new(runtime, http_client, cleanup, options.action_timeout),
        }
    }

    /// Process the packages named in `names` (all when empty), one at a
    /// time. A failing package is recorded and the run moves on.
    #[tracing::instrument(skip(self, manifest, options), fields(mode = %options.mode))]
    pub async fn run(
        &self,
        manifest: &Manifest,
        names: &[String],
        options: &RunOptions,
    ) -> Result<RunSummary, ConfigError> {
        let jobs = manifest
            .select(names)?
            .into_iter()
            .map(|spec| match manifest.commands_for(spec) {
                Some(commands) => Ok((spec, commands)),
                None => Err(ConfigError::MissingPackageType {
                    package: spec.package_name.clone(),
                    package_type: spec.package_type.clone(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut summary = RunSummary::default();

        for (spec, commands) in jobs {
            let status = match self.process(spec, commands, options).await {
                Ok(status) => status,
                Err(e) => {
                    error!("{}: {}", spec.package_name, e);
                    OutcomeStatus::Failed(e)
                }
            };
            summary.outcomes.push(PackageOutcome {
                package: spec.package_name.clone(),
                status,
            });
        }

        Ok(summary)
    }

    async fn process(
        &self,
        spec: &PackageSpec,
        commands: &PackageCommandSet,
        options: &RunOptions,
    ) -> Result<OutcomeStatus, PackageError> {
        let plan = self.reconciler.reconcile(spec, options.mode).await?;

        if plan.decision.is_noop() {
            return Ok(OutcomeStatus::Skipped {
                reason: skip_reason(options.mode, &plan),
            });
        }

        if options.dry_run {
            let command = planned_command(spec, commands, &plan)
                .map(|c| c.to_string())
                .unwrap_or_default();
            return Ok(OutcomeStatus::Planned {
                action: plan.decision.action,
                command,
            });
        }

        self.dispatcher.dispatch(spec, commands, &plan).await?;

        let version = match &plan.release {
            Some(release) if plan.decision.action != Action::Remove => {
                Some(release.remote_version.clone())
            }
            _ => plan.installed.clone(),
        };
        Ok(OutcomeStatus::Succeeded {
            action: plan.decision.action,
            version,
        })
    }
}

fn skip_reason(mode: Mode, plan: &Plan) -> String {
    if let Some(warning) = &plan.decision.warning {
        return warning.clone();
    }

    match (&plan.installed, &plan.release) {
        (None, _) if mode == Mode::Remove => "not installed".to_string(),
        (Some(installed), Some(release)) => {
            match compare(installed, &release.remote_version) {
                VersionComparison::Equal => format!("up to date ({})", installed),
                _ => format!(
                    "{} is installed, latest release is {}",
                    installed, release.remote_version
                ),
            }
        }
        (Some(installed), None) => format!("{} is installed", installed),
        (None, _) => "nothing to do".to_string(),
    }
}
