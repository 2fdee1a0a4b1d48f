//! HTTP command proxy for the Overline one-click GPU miner.
//!
//! Invoking miner commands through a nested shell layer (`wsl -u root bash
//! -c ...`) sometimes returns an empty response. This proxy is a stable,
//! directly reachable process that fronts those commands: it maps a fixed
//! vocabulary of command names onto subprocess invocations against the
//! miner executable and the container runtime, runs them under a hard
//! timeout, and replies with a small JSON envelope.

pub mod api;
pub mod command;
pub mod config;
pub mod enrich;
pub mod error;
pub mod exec;
pub mod net;
pub mod tracing;
