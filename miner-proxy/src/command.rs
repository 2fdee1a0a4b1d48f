//! The proxy's command vocabulary and its resolution to invocations.

use std::fmt;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use strum::{Display, EnumString};

use crate::config::Config;

/// How far back `miner_log` reaches into the container logs, in seconds.
const MINER_LOG_WINDOW_SECS: u64 = 40;

/// How many trailing lines the log-reading commands return.
const LOG_TAIL_LINES: &str = "20";

/// A recognized command name.
///
/// Parsing is exact-match and case-sensitive; anything else is rejected
/// before a subprocess is even considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum CommandKind {
    Health,
    MyIp,
    MinerKey,
    Status,
    ActionLog,
    TestHasherLog,
    MinerLog,
    CheckExecutable,
    DockerImageId,
}

/// What a command resolves to: an in-process answer or a subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Answered without leaving the process.
    Health,
    /// Answered by probing the host's outbound address.
    MyIp,
    /// Answered by spawning a subprocess.
    Spawn(ExecSpec),
}

/// An explicit program-plus-arguments invocation.
///
/// Commands are spawned from argument vectors rather than shell strings,
/// so nothing from the request can ever reach a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl ExecSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for ExecSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

impl CommandKind {
    /// Resolve this command against the configuration.
    ///
    /// `now` feeds the `--since` window of `miner_log`; it is taken as a
    /// parameter so resolution stays deterministic under test.
    pub fn resolve(&self, config: &Config, now: SystemTime) -> Invocation {
        let exe = config.miner_executable.to_string_lossy();
        match self {
            CommandKind::Health => Invocation::Health,
            CommandKind::MyIp => Invocation::MyIp,
            CommandKind::MinerKey => {
                Invocation::Spawn(ExecSpec::new(exe.as_ref()).arg("miner_key"))
            }
            CommandKind::Status => {
                Invocation::Spawn(ExecSpec::new(exe.as_ref()).arg("status"))
            }
            CommandKind::ActionLog => Invocation::Spawn(tail(&config.action_log)),
            CommandKind::TestHasherLog => {
                Invocation::Spawn(tail(&config.test_hasher_log))
            }
            CommandKind::MinerLog => {
                let epoch = now
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs();
                let since = epoch.saturating_sub(MINER_LOG_WINDOW_SECS);
                Invocation::Spawn(
                    ExecSpec::new("docker")
                        .arg("logs")
                        .arg("--since")
                        .arg(since.to_string())
                        .arg(&config.container_name),
                )
            }
            CommandKind::CheckExecutable => {
                Invocation::Spawn(ExecSpec::new("ls").arg(exe.as_ref()))
            }
            CommandKind::DockerImageId => {
                Invocation::Spawn(ExecSpec::new(exe.as_ref()).arg("docker_image_digest"))
            }
        }
    }
}

fn tail(path: &Path) -> ExecSpec {
    ExecSpec::new("tail")
        .arg("-n")
        .arg(LOG_TAIL_LINES)
        .arg(path.to_string_lossy())
}
