use clap::{ArgAction, ArgGroup, Parser};
use ghpm::application::RunOptions;
use ghpm::commands::config::ConfigOptions;
use ghpm::package::Mode;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// ghpm - GitHub release package manager
///
/// Install, update and remove Debian packages published as GitHub release
/// assets. Packages are listed in a JSON file (repos.json).
///
/// If the GITHUB_TOKEN environment variable is set, it will be used for authentication.
/// This is useful for accessing private repositories or avoiding rate limits.
///
/// Exit status: 0 when every package succeeded, 1 when any package failed,
/// 2 when the configuration or the command line is invalid.
///
/// Examples:
///   ghpm -i               # Install configured packages that are missing
///   ghpm -u bat           # Update bat if a newer release exists
///   ghpm -r -n            # Show what removing everything would run
#[derive(Parser, Debug)]
#[command(author, about, version = env!("GHPM_VERSION"), disable_version_flag = true)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["install", "update", "remove"]),
))]
struct Cli {
    /// Install packages that are not installed yet
    #[arg(short = 'i', long)]
    install: bool,

    /// Install missing packages and update outdated ones
    #[arg(short = 'u', long)]
    update: bool,

    /// Remove installed packages
    #[arg(short = 'r', long)]
    remove: bool,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,

    /// Package list (default: ./repos.json, else <config dir>/ghpm/repos.json)
    #[arg(short = 'c', long = "config", env = "GHPM_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Command table overriding the built-in package types
    #[arg(long = "commands", env = "GHPM_COMMANDS", value_name = "PATH")]
    commands: Option<PathBuf>,

    /// GitHub API URL (defaults to https://api.github.com)
    #[arg(long = "api-url", env = "GHPM_API_URL", value_name = "URL")]
    api_url: Option<String>,

    /// HTTP timeout in seconds: connecting, stalled transfers and API requests
    #[arg(long, value_name = "SECS", default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Timeout for version commands in seconds
    #[arg(long = "probe-timeout", value_name = "SECS", default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    probe_timeout: u64,

    /// Timeout for package manager commands in seconds (default: none)
    #[arg(long = "action-timeout", value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    action_timeout: Option<u64>,

    /// Show what would be done without downloading or changing anything
    #[arg(short = 'n', long = "dry-run")]
    dry_run: bool,

    /// Only process these packages (default: all configured packages)
    #[arg(value_name = "PACKAGE")]
    packages: Vec<String>,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.remove {
            Mode::Remove
        } else if self.update {
            Mode::Update
        } else {
            Mode::Install
        }
    }

    fn config_options(&self) -> ConfigOptions {
        ConfigOptions {
            config_path: self.config.clone(),
            commands_path: self.commands.clone(),
            api_url: self.api_url.clone(),
            http_timeout: Some(Duration::from_secs(self.timeout)),
        }
    }

    fn run_options(&self) -> RunOptions {
        RunOptions {
            mode: self.mode(),
            dry_run: self.dry_run,
            probe_timeout: Duration::from_secs(self.probe_timeout),
            action_timeout: self.action_timeout.map(Duration::from_secs),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = ghpm::runtime::RealRuntime;

    match ghpm::commands::run(runtime, cli.config_options(), &cli.packages, cli.run_options()).await
    {
        Ok(summary) if summary.has_failures() => ExitCode::from(1),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
