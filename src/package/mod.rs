//! Package domain module
//!
//! This module holds the configuration model of managed packages and the
//! pure logic applied to it: version comparison and the reconciliation
//! decision table.

mod command;
mod decision;
mod manifest;
mod spec;
pub mod version;

pub use command::{
    ActionCommands, CommandTable, CommandTemplate, DEFAULT_PACKAGE_TYPE, PLACEHOLDER,
    PackageCommandSet,
};
pub use decision::{Action, Decision, Mode, VersionPair, decide, decide_removal};
pub use manifest::Manifest;
pub use spec::{
    DEFAULT_ASSET_FILTER, DEFAULT_VERSION_COMMAND, PackageSpec, RawPackageSpec, VersionPattern,
};
pub use version::{VersionComparison, compare, normalize_tag};
