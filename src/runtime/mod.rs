//! Runtime abstraction for system operations.
//!
//! This module provides a trait-based abstraction over system operations,
//! enabling dependency injection and testability.
//!
//! # Structure
//!
//! - `env` - Environment variables and well-known directories
//! - `fs` - File system operations (read, create, temporary directories)
//! - `process` - Subprocess execution with timeouts

mod env;
mod fs;
mod process;

use anyhow::Result;
use async_trait::async_trait;
use std::env as std_env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use process::{CommandLine, CommandOutput, CommandStatus};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Runtime: Send + Sync {
    // Environment
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError>;

    // File System
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn exists(&self, path: &Path) -> bool;
    fn create_file(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>>;

    /// Create a uniquely named directory under the system temp dir.
    /// The directory and its contents are deleted when the handle is dropped.
    fn create_temp_dir(&self, prefix: &str) -> Result<tempfile::TempDir>;

    // Directories
    fn config_dir(&self) -> Option<PathBuf>;
    fn current_dir(&self) -> Result<PathBuf>;

    // Processes
    /// Run a command with captured output. The child is killed if it is still
    /// running when `timeout` elapses, and an error is returned.
    async fn capture(&self, command: &CommandLine, timeout: Duration) -> Result<CommandOutput>;

    /// Run a command attached to the terminal, so that prompts (e.g. sudo) reach the user.
    async fn execute(
        &self,
        command: &CommandLine,
        timeout: Option<Duration>,
    ) -> Result<CommandStatus>;
}

pub struct RealRuntime;

#[async_trait]
impl Runtime for RealRuntime {
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError> {
        self.env_var_impl(key)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.read_to_string_impl(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.exists_impl(path)
    }

    fn create_file(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>> {
        self.create_file_impl(path)
    }

    fn create_temp_dir(&self, prefix: &str) -> Result<tempfile::TempDir> {
        self.create_temp_dir_impl(prefix)
    }

    fn config_dir(&self) -> Option<PathBuf> {
        self.config_dir_impl()
    }

    fn current_dir(&self) -> Result<PathBuf> {
        self.current_dir_impl()
    }

    async fn capture(&self, command: &CommandLine, timeout: Duration) -> Result<CommandOutput> {
        self.capture_impl(command, timeout).await
    }

    async fn execute(
        &self,
        command: &CommandLine,
        timeout: Option<Duration>,
    ) -> Result<CommandStatus> {
        self.execute_impl(command, timeout).await
    }
}
