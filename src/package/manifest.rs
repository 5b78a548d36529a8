//! Loading and validating the package configuration.

use std::collections::HashSet;
use std::path::Path;

use log::debug;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigError;
use crate::runtime::Runtime;

use super::command::{CommandTable, PackageCommandSet};
use super::spec::{PackageSpec, RawPackageSpec};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestDocument {
    packages: Vec<RawPackageSpec>,
    #[serde(default)]
    package_types: CommandTable,
}

/// Everything a run needs to know about the configured packages.
#[derive(Debug, Clone)]
pub struct Manifest {
    packages: Vec<PackageSpec>,
    commands: CommandTable,
}

impl Manifest {
    /// Read the package list at `path` and, if given, a command table at
    /// `commands_path` that overrides the built-in and inline package types.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(
        runtime: &R,
        path: &Path,
        commands_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        debug!("Loading packages from {:?}", path);
        let text = read(runtime, path)?;
        let (packages, mut commands) = parse_document(&text, path)?;

        if let Some(commands_path) = commands_path {
            debug!("Loading package types from {:?}", commands_path);
            let text = read(runtime, commands_path)?;
            let overrides: CommandTable =
                serde_json::from_str(&text).map_err(|source| ConfigError::Malformed {
                    path: commands_path.to_path_buf(),
                    source,
                })?;
            commands.merge(overrides);
        }

        Self::new(packages, commands)
    }

    /// Validate raw package entries against a command table.
    pub fn new(packages: Vec<RawPackageSpec>, commands: CommandTable) -> Result<Self, ConfigError> {
        commands.validate()?;

        let mut seen = HashSet::new();
        let mut specs = Vec::with_capacity(packages.len());

        for raw in packages {
            let spec = PackageSpec::try_from(raw)?;

            if !seen.insert(spec.package_name.clone()) {
                return Err(ConfigError::DuplicatePackage(spec.package_name));
            }
            if commands.get(&spec.package_type).is_none() {
                return Err(ConfigError::MissingPackageType {
                    package: spec.package_name,
                    package_type: spec.package_type,
                });
            }

            specs.push(spec);
        }

        Ok(Self {
            packages: specs,
            commands,
        })
    }

    pub fn packages(&self) -> &[PackageSpec] {
        &self.packages
    }

    /// Commands for a package's type. Present for every configured package.
    pub fn commands_for(&self, spec: &PackageSpec) -> Option<&PackageCommandSet> {
        self.commands.get(&spec.package_type)
    }

    /// Packages named in `names`, in configuration order; all packages when
    /// `names` is empty.
    pub fn select(&self, names: &[String]) -> Result<Vec<&PackageSpec>, ConfigError> {
        if names.is_empty() {
            return Ok(self.packages.iter().collect());
        }

        if let Some(unknown) = names
            .iter()
            .find(|name| !self.packages.iter().any(|p| &p.package_name == *name))
        {
            return Err(ConfigError::UnknownPackage(unknown.clone()));
        }

        Ok(self
            .packages
            .iter()
            .filter(|p| names.contains(&p.package_name))
            .collect())
    }
}

fn read<R: Runtime>(runtime: &R, path: &Path) -> Result<String, ConfigError> {
    runtime
        .read_to_string(path)
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })
}

/// Accepts either a bare array of packages or an object with `packages`
/// and optional inline `package_types`.
fn parse_document(
    text: &str,
    path: &Path,
) -> Result<(Vec<RawPackageSpec>, CommandTable), ConfigError> {
    let malformed = |source: serde_json::Error| ConfigError::Malformed {
        path: path.to_path_buf(),
        source,
    };

    let value: Value = serde_json::from_str(text).map_err(malformed)?;
    let mut commands = CommandTable::builtin();

    let packages = if value.is_array() {
        serde_json::from_value(value).map_err(malformed)?
    } else {
        let document: ManifestDocument = serde_json::from_value(value).map_err(malformed)?;
        commands.merge(document.package_types);
        document.packages
    };

    Ok((packages, commands))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use std::path::PathBuf;

    const LEGACY: &str = r#"[
        {
            "owner": "Alex313031",
            "repo": "thorium",
            "package_name": "thorium-browser",
            "version_command": "thorium-browser --version",
            "version_result_regular_expression": "Thorium ([0-9.]+)",
            "asset_pattern": "*_AVX2.deb"
        }
    ]"#;

    fn runtime_with_files(files: Vec<(&'static str, &'static str)>) -> MockRuntime {
        let mut runtime = MockRuntime::new();
        for (path, content) in files {
            runtime
                .expect_read_to_string()
                .with(eq(PathBuf::from(path)))
                .returning(move |_| Ok(content.to_string()));
        }
        runtime
    }

    #[test]
    fn test_load_legacy_array() {
        let runtime = runtime_with_files(vec![("/etc/ghpm/repos.json", LEGACY)]);

        let manifest = Manifest::load(&runtime, Path::new("/etc/ghpm/repos.json"), None).unwrap();

        assert_eq!(manifest.packages().len(), 1);
        let spec = &manifest.packages()[0];
        assert_eq!(spec.package_name, "thorium-browser");
        assert!(manifest.commands_for(spec).is_some());
    }

    #[test]
    fn test_load_document_with_inline_types_and_override_file() {
        let runtime = runtime_with_files(vec![
            (
                "/cfg/repos.json",
                r#"{
                    "packages": [
                        {"owner": "o", "repo": "app", "package_name": "app", "package_type": "nala"},
                        {"owner": "o", "repo": "tool", "package_name": "tool"}
                    ],
                    "package_types": {
                        "nala": {
                            "install": "sudo nala install -y {package}",
                            "update": "sudo nala install -y {package}",
                            "remove": "sudo nala remove -y {package}"
                        }
                    }
                }"#,
            ),
            (
                "/cfg/commands.json",
                r#"{"nala": {"install": "nala install {package}", "update": "nala install {package}", "remove": "nala remove {package}"}}"#,
            ),
        ]);

        let manifest = Manifest::load(
            &runtime,
            Path::new("/cfg/repos.json"),
            Some(Path::new("/cfg/commands.json")),
        )
        .unwrap();

        let app = &manifest.packages()[0];
        let commands = manifest.commands_for(app).unwrap();
        assert_eq!(
            commands.install.command.render("x.deb").to_string(),
            "nala install x.deb"
        );

        // Built-in type still available
        let tool = &manifest.packages()[1];
        assert_eq!(tool.package_type, "deb");
        assert!(manifest.commands_for(tool).is_some());
    }

    #[test]
    fn test_missing_package_type() {
        let raw: Vec<RawPackageSpec> = serde_json::from_str(
            r#"[{"owner": "o", "repo": "r", "package_name": "p", "package_type": "rpm"}]"#,
        )
        .unwrap();

        let err = Manifest::new(raw, CommandTable::builtin()).unwrap_err();
        match err {
            ConfigError::MissingPackageType {
                package,
                package_type,
            } => {
                assert_eq!(package, "p");
                assert_eq!(package_type, "rpm");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_package_names() {
        let raw: Vec<RawPackageSpec> = serde_json::from_str(
            r#"[
                {"owner": "o", "repo": "a", "package_name": "same"},
                {"owner": "o", "repo": "b", "package_name": "same"}
            ]"#,
        )
        .unwrap();

        assert!(matches!(
            Manifest::new(raw, CommandTable::builtin()),
            Err(ConfigError::DuplicatePackage(name)) if name == "same"
        ));
    }

    #[test]
    fn test_malformed_json() {
        let runtime = runtime_with_files(vec![("/cfg/repos.json", "[{")]);
        let err = Manifest::load(&runtime, Path::new("/cfg/repos.json"), None).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));

        let runtime = runtime_with_files(vec![("/cfg/repos.json", r#"{"pakages": []}"#)]);
        let err = Manifest::load(&runtime, Path::new("/cfg/repos.json"), None).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn test_unreadable_file() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_read_to_string()
            .returning(|_| Err(anyhow::anyhow!("No such file or directory")));

        let err = Manifest::load(&runtime, Path::new("/missing.json"), None).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/missing.json"));
    }

    #[test]
    fn test_select_by_name() {
        let raw: Vec<RawPackageSpec> = serde_json::from_str(
            r#"[
                {"owner": "o", "repo": "a", "package_name": "a"},
                {"owner": "o", "repo": "b", "package_name": "b"},
                {"owner": "o", "repo": "c", "package_name": "c"}
            ]"#,
        )
        .unwrap();
        let manifest = Manifest::new(raw, CommandTable::builtin()).unwrap();

        assert_eq!(manifest.select(&[]).unwrap().len(), 3);

        let picked = manifest
            .select(&["c".to_string(), "a".to_string()])
            .unwrap();
        let names: Vec<_> = picked.iter().map(|p| p.package_name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);

        assert!(matches!(
            manifest.select(&["zzz".to_string()]),
            Err(ConfigError::UnknownPackage(name)) if name == "zzz"
        ));
    }
}
