use anyhow::Result;
use log::debug;

use crate::{
    application::{RunOptions, RunSummary, RunUseCase},
    cleanup::{new_shared, spawn_interrupt_handler},
    package::Manifest,
    runtime::Runtime,
};

pub mod config;
mod services;

use config::{Config, ConfigOptions};
use services::Services;

/// Load the configuration, reconcile the selected packages and print a
/// summary.
///
/// Configuration problems are returned as errors wrapping
/// [`crate::error::ConfigError`]; package failures are part of the summary.
#[tracing::instrument(skip(runtime, config_options, names, options))]
pub async fn run<R: Runtime>(
    runtime: R,
    config_options: ConfigOptions,
    names: &[String],
    options: RunOptions,
) -> Result<RunSummary> {
    let config = Config::load(&runtime, config_options)?;
    let manifest = Manifest::load(
        &runtime,
        &config.manifest_path,
        config.commands_path.as_deref(),
    )?;
    debug!("Loaded {} package(s)", manifest.packages().len());

    let services = Services::from_config(&config)?;

    let cleanup = new_shared();
    let interrupt_handler = spawn_interrupt_handler(cleanup.clone());

    let use_case = RunUseCase::new(
        &runtime,
        &services.provider,
        &services.http_client,
        cleanup,
        &options,
    );
    let result = use_case.run(&manifest, names, &options).await;
    interrupt_handler.abort();
    let summary = result?;

    print_summary(&summary, options.dry_run);
    Ok(summary)
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    if summary.outcomes.is_empty() {
        println!("No packages configured.");
        return;
    }

    println!();
    for outcome in &summary.outcomes {
        println!("{}", outcome);
    }
    if dry_run {
        println!("\nDry run: {}", summary);
    } else {
        println!("\n{}", summary);
    }
}
