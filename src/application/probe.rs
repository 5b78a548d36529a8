use std::time::Duration;

use log::{debug, info};

use crate::package::{PackageSpec, normalize_tag};
use crate::runtime::Runtime;

/// Installed version of a package according to its version command.
///
/// Every failure mode (missing binary, non-zero exit, timeout, output that
/// does not match the pattern) reads as "not installed". The extracted
/// version loses its leading non-numeric prefix, as release tags do.
#[tracing::instrument(skip(runtime, spec), fields(package = %spec.package_name))]
pub async fn installed_version<R: Runtime>(
    runtime: &R,
    spec: &PackageSpec,
    timeout: Duration,
) -> Option<String> {
    let command = spec.probe_command();

    let output = match runtime.capture(&command, timeout).await {
        Ok(output) => output,
        Err(e) => {
            info!("{}: version probe failed: {:#}", spec.package_name, e);
            return None;
        }
    };

    if !output.success() {
        debug!(
            "{}: `{}` exited with {:?}",
            spec.package_name, command, output.code
        );
        return None;
    }

    let text = if output.stdout.trim().is_empty() {
        &output.stderr
    } else {
        &output.stdout
    };

    let version = spec
        .version_pattern
        .extract(text)
        .map(|version| normalize_tag(&version).to_string());
    if version.is_none() {
        info!(
            "{}: no version found in the output of `{}`",
            spec.package_name, command
        );
    }
    version
}
