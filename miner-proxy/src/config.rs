//! Startup configuration for miner-proxy.
//!
//! Everything is fixed at startup: listen address, the miner executable,
//! the node container name, and the auxiliary file paths the log commands
//! read. There is no runtime reconfiguration.

use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::tracing::prelude::*;

/// Proxy configuration, parsed from command-line flags with environment
/// variable fallbacks.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "miner-proxyd",
    about = "HTTP command proxy for the Overline one-click GPU miner"
)]
pub struct Config {
    /// IP address on which the server listens
    #[arg(
        short = 'l',
        long,
        env = "MINER_PROXY_LISTEN",
        default_value = "0.0.0.0"
    )]
    pub listen: IpAddr,

    /// Port on which the server listens
    #[arg(short = 'p', long, env = "MINER_PROXY_PORT", default_value_t = 31234)]
    pub port: u16,

    /// Path to the GPU miner executable
    #[arg(
        long,
        env = "MINER_PROXY_EXECUTABLE",
        default_value = "/usr/local/bin/overline_gpu_miner"
    )]
    pub miner_executable: PathBuf,

    /// Name of the node container whose logs `miner_log` reads
    #[arg(long, env = "MINER_PROXY_CONTAINER", default_value = "bcnode")]
    pub container_name: String,

    /// Action log written by the one-click installer
    #[arg(
        long,
        env = "MINER_PROXY_ACTION_LOG",
        default_value = "/var/log/overline/one_click_miner_action.log"
    )]
    pub action_log: PathBuf,

    /// Log written by the test hasher run
    #[arg(
        long,
        env = "MINER_PROXY_TEST_HASHER_LOG",
        default_value = "/var/log/overline/test_hasher.log"
    )]
    pub test_hasher_log: PathBuf,

    /// Progress file written while a chain snapshot is downloading
    #[arg(
        long,
        env = "MINER_PROXY_SNAPSHOT_PROGRESS",
        default_value = "/var/log/overline/snapshot_download_progress.log"
    )]
    pub snapshot_progress: PathBuf,

    /// Output file written by the GPU miner process
    #[arg(
        long,
        env = "MINER_PROXY_GPU_OUTPUT",
        default_value = "/var/log/overline/gpu_miner_output.log"
    )]
    pub gpu_miner_output: PathBuf,

    /// Directory for the proxy's own rotated log files
    #[arg(
        long,
        env = "MINER_PROXY_LOG_DIR",
        default_value = "/var/log/miner-proxy"
    )]
    pub log_dir: PathBuf,
}

impl Config {
    /// Check the configuration once at startup.
    ///
    /// Empty required settings are errors. Auxiliary files that do not
    /// exist yet only warn; the installer and miner create them later.
    pub fn validate(&self) -> Result<()> {
        if self.container_name.is_empty() {
            return Err(Error::Config("container name must not be empty".into()));
        }
        if self.miner_executable.as_os_str().is_empty() {
            return Err(Error::Config("miner executable path must not be empty".into()));
        }
        if self.action_log.as_os_str().is_empty() {
            return Err(Error::Config("action log path must not be empty".into()));
        }

        if !self.miner_executable.exists() {
            warn!(
                path = %self.miner_executable.display(),
                "miner executable not found; miner commands will fail until it is installed"
            );
        }
        for (name, path) in [
            ("action log", &self.action_log),
            ("test hasher log", &self.test_hasher_log),
            ("snapshot progress file", &self.snapshot_progress),
            ("gpu miner output file", &self.gpu_miner_output),
        ] {
            if !path.exists() {
                debug!(path = %path.display(), "{name} does not exist yet");
            }
        }

        Ok(())
    }
}
