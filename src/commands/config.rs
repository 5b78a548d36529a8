use anyhow::Result;
use log::debug;
use std::path::PathBuf;
use std::time::Duration;

use crate::provider::DEFAULT_API_URL;
use crate::runtime::Runtime;

const MANIFEST_FILE: &str = "repos.json";
const APP_DIR: &str = "ghpm";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Values given on the command line (or through their environment variables).
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    pub config_path: Option<PathBuf>,
    pub commands_path: Option<PathBuf>,
    pub api_url: Option<String>,
    pub http_timeout: Option<Duration>,
}

/// Settings for one run, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Package list (`repos.json`)
    pub manifest_path: PathBuf,
    /// Optional command table overriding the built-in package types
    pub commands_path: Option<PathBuf>,
    pub api_url: String,
    pub token: Option<String>,
    pub http_timeout: Duration,
}

impl Config {
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, options: ConfigOptions) -> Result<Self> {
        let manifest_path = match options.config_path {
            Some(path) => path,
            None => default_manifest_path(runtime)?,
        };
        debug!("Using package list {:?}", manifest_path);

        let token = runtime
            .env_var("GITHUB_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        if token.is_some() {
            debug!("Using GITHUB_TOKEN for authentication");
        }

        Ok(Self {
            manifest_path,
            commands_path: options.commands_path,
            api_url: options
                .api_url
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token,
            http_timeout: options.http_timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT),
        })
    }
}

/// `./repos.json` when present, otherwise `<config dir>/ghpm/repos.json`.
fn default_manifest_path<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    let local = runtime.current_dir()?.join(MANIFEST_FILE);
    if runtime.exists(&local) {
        return Ok(local);
    }

    Ok(match runtime.config_dir() {
        Some(dir) => dir.join(APP_DIR).join(MANIFEST_FILE),
        None => local,
    })
}
