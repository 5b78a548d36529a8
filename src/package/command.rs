//! Package manager command templates.
//!
//! Templates are argument vectors. The `{package}` placeholder is replaced
//! inside individual arguments, so a file path or package name containing
//! spaces or shell metacharacters always stays one argument.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::runtime::CommandLine;

use super::decision::Action;

pub const PLACEHOLDER: &str = "{package}";

/// The package type every configuration gets for free.
pub const DEFAULT_PACKAGE_TYPE: &str = "deb";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawTemplate")]
pub struct CommandTemplate {
    args: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTemplate {
    Args(Vec<String>),
    Line(String),
}

impl From<RawTemplate> for CommandTemplate {
    fn from(raw: RawTemplate) -> Self {
        match raw {
            RawTemplate::Args(args) => Self { args },
            RawTemplate::Line(line) => Self::parse(&line),
        }
    }
}

impl CommandTemplate {
    /// Split a whitespace separated command line into arguments.
    pub fn parse(line: &str) -> Self {
        Self {
            args: line.split_whitespace().map(String::from).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn has_placeholder(&self) -> bool {
        self.args.iter().any(|arg| arg.contains(PLACEHOLDER))
    }

    /// Substitute `{package}` and produce a runnable command.
    pub fn render(&self, package: &str) -> CommandLine {
        let mut args = self.args.iter().map(|arg| arg.replace(PLACEHOLDER, package));
        let program = args.next().unwrap_or_default();
        CommandLine::new(program, args.collect())
    }
}

/// Commands for one action: the primary command and, for when it fails, a
/// fallback sequence whose steps must all succeed in order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawAction")]
pub struct ActionCommands {
    pub command: CommandTemplate,
    pub fallback: Vec<CommandTemplate>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAction {
    Simple(CommandTemplate),
    Detailed {
        command: CommandTemplate,
        #[serde(default)]
        fallback: Vec<CommandTemplate>,
    },
}

impl From<RawAction> for ActionCommands {
    fn from(raw: RawAction) -> Self {
        match raw {
            RawAction::Simple(command) => Self {
                command,
                fallback: Vec::new(),
            },
            RawAction::Detailed { command, fallback } => Self { command, fallback },
        }
    }
}

impl ActionCommands {
    /// Every command, primary first.
    pub fn attempts(&self) -> impl Iterator<Item = &CommandTemplate> {
        std::iter::once(&self.command).chain(self.fallback.iter())
    }

    fn validate(&self, package_type: &str, action: &'static str) -> Result<(), ConfigError> {
        if self.attempts().any(CommandTemplate::is_empty) {
            return Err(ConfigError::EmptyCommand {
                package_type: package_type.to_string(),
                action,
            });
        }
        if !self.command.has_placeholder() {
            return Err(ConfigError::MissingPlaceholder {
                package_type: package_type.to_string(),
                action,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackageCommandSet {
    pub install: ActionCommands,
    pub update: ActionCommands,
    pub remove: ActionCommands,
}

impl PackageCommandSet {
    /// Commands for `action`, `None` for [`Action::NoOp`].
    pub fn for_action(&self, action: Action) -> Option<&ActionCommands> {
        match action {
            Action::Install => Some(&self.install),
            Action::Update => Some(&self.update),
            Action::Remove => Some(&self.remove),
            Action::NoOp => None,
        }
    }

    fn validate(&self, package_type: &str) -> Result<(), ConfigError> {
        self.install.validate(package_type, "install")?;
        self.update.validate(package_type, "update")?;
        self.remove.validate(package_type, "remove")
    }

    /// `apt-get install`, else `dpkg -i` followed by a dependency repair.
    fn apt() -> Self {
        let install = ActionCommands {
            command: CommandTemplate::parse("sudo apt-get install -y {package}"),
            fallback: vec![
                CommandTemplate::parse("sudo dpkg -i {package}"),
                CommandTemplate::parse("sudo apt-get install -f -y"),
            ],
        };
        Self {
            update: install.clone(),
            install,
            remove: ActionCommands {
                command: CommandTemplate::parse("sudo apt-get remove -y {package}"),
                fallback: vec![CommandTemplate::parse("sudo dpkg -r {package}")],
            },
        }
    }
}

/// Mapping from package type to its commands.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(transparent)]
pub struct CommandTable(HashMap<String, PackageCommandSet>);

impl CommandTable {
    /// Table holding the built-in `deb` commands.
    pub fn builtin() -> Self {
        let mut table = HashMap::new();
        table.insert(DEFAULT_PACKAGE_TYPE.to_string(), PackageCommandSet::apt());
        Self(table)
    }

    /// Entries from `other` replace entries of the same package type.
    pub fn merge(&mut self, other: CommandTable) {
        self.0.extend(other.0);
    }

    pub fn get(&self, package_type: &str) -> Option<&PackageCommandSet> {
        self.0.get(package_type)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut types: Vec<_> = self.0.iter().collect();
        types.sort_by(|a, b| a.0.cmp(b.0));
        for (package_type, commands) in types {
            commands.validate(package_type)?;
        }
        Ok(())
    }
}
