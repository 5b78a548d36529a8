//! Reconciliation decision table.

use std::fmt;

use super::version::{VersionComparison, compare};

/// What the user asked the run to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Install,
    Update,
    Remove,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Install => "install",
            Mode::Update => "update",
            Mode::Remove => "remove",
        })
    }
}

/// Action chosen for one package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NoOp,
    Install,
    Update,
    Remove,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::NoOp => "no-op",
            Action::Install => "install",
            Action::Update => "update",
            Action::Remove => "remove",
        })
    }
}

/// Installed and remote version of one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPair {
    /// `None` when the local probe failed or its output did not match.
    pub installed: Option<String>,
    pub remote: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub action: Action,
    pub download_required: bool,
    pub warning: Option<String>,
}

impl Decision {
    fn new(action: Action) -> Self {
        Self {
            action,
            download_required: matches!(action, Action::Install | Action::Update),
            warning: None,
        }
    }

    fn warn(mut self, warning: String) -> Self {
        self.warning = Some(warning);
        self
    }

    pub fn is_noop(&self) -> bool {
        self.action == Action::NoOp
    }
}

/// Decide what to do for `mode` given the installed and remote versions.
///
/// An incomparable pair leans towards acting: install mode installs, update
/// mode updates, and the decision carries a warning.
pub fn decide(mode: Mode, versions: &VersionPair) -> Decision {
    let Some(installed) = versions.installed.as_deref() else {
        return match mode {
            Mode::Install | Mode::Update => Decision::new(Action::Install),
            Mode::Remove => Decision::new(Action::NoOp),
        };
    };

    match (mode, compare(installed, &versions.remote)) {
        (Mode::Remove, _) => Decision::new(Action::Remove),

        (_, VersionComparison::Equal) => Decision::new(Action::NoOp),

        (Mode::Install, VersionComparison::Less | VersionComparison::Greater) => {
            Decision::new(Action::NoOp)
        }
        (Mode::Install, VersionComparison::Incomparable(e)) => Decision::new(Action::Install)
            .warn(format!("{}; installing {} anyway", e, versions.remote)),

        (Mode::Update, VersionComparison::Less) => Decision::new(Action::Update),
        (Mode::Update, VersionComparison::Greater) => Decision::new(Action::NoOp).warn(format!(
            "installed version {} is newer than the latest release {}",
            installed, versions.remote
        )),
        (Mode::Update, VersionComparison::Incomparable(e)) => Decision::new(Action::Update)
            .warn(format!("{}; updating to {} anyway", e, versions.remote)),
    }
}

/// Decision for remove mode, which only depends on whether the package is installed.
pub fn decide_removal(installed: Option<&str>) -> Decision {
    match installed {
        Some(_) => Decision::new(Action::Remove),
        None => Decision::new(Action::NoOp),
    }
}
