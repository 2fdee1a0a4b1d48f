//! Bounded subprocess execution.
//!
//! Every proxied command runs under a hard timeout with the child killed
//! (not leaked) when the limit fires. The server must keep serving no
//! matter how a command fails, so nothing in here returns an error: every
//! failure mode collapses into a [`CommandOutcome`] for the caller.

use serde::Serialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::command::ExecSpec;
use crate::tracing::prelude::*;

/// Hard limit on how long any proxied command may run.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome status reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Result envelope for one command invocation.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    pub status: Status,
    pub output: String,
}

impl CommandOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            output: output.into(),
        }
    }

    pub fn error(output: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            output: output.into(),
        }
    }
}

/// Run `spec` with the default timeout.
pub async fn run(spec: &ExecSpec) -> CommandOutcome {
    run_with_timeout(spec, COMMAND_TIMEOUT).await
}

/// Run `spec`, killing the child if it outlives `timeout`.
///
/// stdout and stderr are both captured and merged (stdout first), decoded
/// lossily as UTF-8, and trimmed of trailing whitespace. A non-zero exit,
/// a timeout, or a spawn failure all map to [`Status::Error`] with
/// whatever output was captured.
pub async fn run_with_timeout(spec: &ExecSpec, timeout: Duration) -> CommandOutcome {
    info!(command = %spec, "running command");

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let outcome = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => {
            let text = merge_output(&output.stdout, &output.stderr);
            if output.status.success() {
                CommandOutcome::success(text)
            } else {
                warn!(
                    command = %spec,
                    code = ?output.status.code(),
                    "command exited non-zero"
                );
                CommandOutcome::error(text)
            }
        }
        Ok(Err(e)) => {
            error!(command = %spec, error = %e, "failed to run command");
            CommandOutcome::error(String::new())
        }
        Err(_) => {
            // Dropping the output future kills the child via kill_on_drop.
            warn!(
                command = %spec,
                timeout_secs = timeout.as_secs_f64(),
                "command timed out"
            );
            CommandOutcome::error(String::new())
        }
    };

    info!(command = %spec, status = ?outcome.status, "command finished");
    outcome
}

// The shell variant of this proxy merged streams with `2>&1`. Separate
// pipes cannot reproduce the interleaving, so stderr follows stdout.
fn merge_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(stdout).into_owned();
    if !stderr.is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&String::from_utf8_lossy(stderr));
    }
    text.trim_end().to_string()
}
