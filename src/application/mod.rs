//! Application layer - Use cases that coordinate domain services.
//!
//! A run reconciles each selected package in turn: probe the installed
//! version, resolve the latest release, decide, then dispatch the decision
//! to the package manager.

mod dispatch;
mod probe;
mod reconcile;
mod resolve;
mod run;

pub use dispatch::{Dispatcher, planned_command};
pub use probe::installed_version;
pub use reconcile::{Plan, Reconciler};
pub use resolve::{ReleaseResolver, ResolvedRelease};
pub use run::{OutcomeStatus, PackageOutcome, RunOptions, RunSummary, RunUseCase};
