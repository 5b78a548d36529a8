//! Execution of a reconciliation decision through the package manager.

use std::path::Path;
use std::time::Duration;

use log::{debug, warn};

use crate::cleanup::{CleanupGuard, SharedCleanupContext};
use crate::download::download_asset;
use crate::error::PackageError;
use crate::http::HttpClient;
use crate::package::{Action, ActionCommands, PackageCommandSet, PackageSpec};
use crate::runtime::{CommandLine, Runtime};

use super::reconcile::Plan;

/// Right-aligned progress verb for an action.
fn progress_verb(action: Action) -> &'static str {
    match action {
        Action::Install => "installing",
        Action::Update => "updating",
        Action::Remove => "removing",
        Action::NoOp => "skipping",
    }
}

pub struct Dispatcher<'a, R: Runtime> {
    runtime: &'a R,
    http_client: &'a HttpClient,
    cleanup: SharedCleanupContext,
    action_timeout: Option<Duration>,
}

impl<'a, R: Runtime> Dispatcher<'a, R> {
    pub fn new(
        runtime: &'a R,
        http_client: &'a HttpClient,
        cleanup: SharedCleanupContext,
        action_timeout: Option<Duration>,
    ) -> Self {
        Self {
            runtime,
            http_client,
            cleanup,
            action_timeout,
        }
    }

    /// Carry out `plan` for `spec`. A no-op plan does nothing.
    ///
    /// Downloads land in a fresh temporary directory that is removed when
    /// this returns, whatever the outcome.
    #[tracing::instrument(skip_all, fields(package = %spec.package_name, action = %plan.decision.action))]
    pub async fn dispatch(
        &self,
        spec: &PackageSpec,
        commands: &PackageCommandSet,
        plan: &Plan,
    ) -> Result<(), PackageError> {
        let action = plan.decision.action;
        let Some(action_commands) = commands.for_action(action) else {
            return Ok(());
        };

        let Some(release) = plan.download() else {
            println!("{:>12} {}", progress_verb(action), spec.package_name);
            return self.run_attempts(action_commands, &spec.package_name).await;
        };

        let download_error = |source: anyhow::Error| PackageError::Download {
            url: release.asset.download_url.clone(),
            source,
        };
        let dir = self
            .runtime
            .create_temp_dir("ghpm-")
            .map_err(download_error)?;
        let _guard = CleanupGuard::new(self.cleanup.clone(), dir.path().to_path_buf());

        println!(
            " downloading {} {}",
            spec.package_name, release.remote_version
        );
        let path = download_asset(self.runtime, self.http_client, &release.asset, dir.path()).await?;

        println!(
            "{:>12} {} {}",
            progress_verb(action),
            spec.package_name,
            release.remote_version
        );
        self.run_attempts(action_commands, &path.to_string_lossy())
            .await
    }

    /// Primary command. When it fails, the fallback steps run in order and
    /// each one must succeed; the first failing step fails the action.
    async fn run_attempts(&self, commands: &ActionCommands, target: &str) -> Result<(), PackageError> {
        let failure = match self.attempt(&commands.command.render(target)).await {
            Ok(()) => return Ok(()),
            Err(failure) if commands.fallback.is_empty() => return Err(failure),
            Err(failure) => failure,
        };

        warn!("{}; running fallback", failure);
        for step in &commands.fallback {
            self.attempt(&step.render(target)).await?;
        }
        Ok(())
    }

    async fn attempt(&self, command: &CommandLine) -> Result<(), PackageError> {
        debug!("Running `{}`", command);

        let code = match self.runtime.execute(command, self.action_timeout).await {
            Ok(status) if status.success() => return Ok(()),
            Ok(status) => status.code,
            Err(e) => {
                warn!("{:#}", e);
                None
            }
        };

        Err(PackageError::ActionExecution {
            command: command.to_string(),
            code,
        })
    }
}

/// The primary command `plan` would run, with the download location shown
/// as `<download-dir>/<asset name>`. `None` for a no-op.
pub fn planned_command(
    spec: &PackageSpec,
    commands: &PackageCommandSet,
    plan: &Plan,
) -> Option<CommandLine> {
    let action_commands = commands.for_action(plan.decision.action)?;
    let target = match plan.download() {
        Some(release) => Path::new("<download-dir>")
            .join(&release.asset.name)
            .to_string_lossy()
            .into_owned(),
        None => spec.package_name.clone(),
    };
    Some(action_commands.command.render(&target))
}
