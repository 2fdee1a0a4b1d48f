//! Post-processing of command output from auxiliary files.
//!
//! Two commands get extra context appended before the response goes out:
//! `action_log` picks up snapshot download progress while the node is
//! fetching a chain snapshot, and `miner_log` picks up the GPU miner's own
//! output file. The proxy only ever reads these files. A missing file
//! means no enrichment, never an error.

use std::fs;
use std::io;
use std::path::Path;

use time::{OffsetDateTime, UtcOffset};

use crate::command::CommandKind;
use crate::config::Config;
use crate::exec::CommandOutcome;
use crate::tracing::prelude::*;

/// Printed by the installer when the node starts a chain snapshot download.
pub const SNAPSHOT_MARKER: &str = "Downloading new snapshot. It may take 45 minutes \
to 2 hours depending on connection speed";

const PROGRESS_TAIL_LINES: usize = 5;
const GPU_OUTPUT_TAIL_LINES: usize = 10;

/// Append auxiliary file context to `outcome` where the command calls for it.
pub fn apply(kind: CommandKind, config: &Config, outcome: &mut CommandOutcome) {
    match kind {
        CommandKind::ActionLog => append_snapshot_progress(config, outcome),
        CommandKind::MinerLog => append_gpu_output(config, outcome),
        _ => {}
    }
}

// While a snapshot downloads, the action log sits on the marker line for
// up to two hours; the progress file is the only sign of life.
fn append_snapshot_progress(config: &Config, outcome: &mut CommandOutcome) {
    if !outcome.output.ends_with(SNAPSHOT_MARKER) {
        return;
    }
    match tail_lines(&config.snapshot_progress, PROGRESS_TAIL_LINES) {
        Ok(lines) => {
            outcome.output.push('\n');
            outcome.output.push_str(&lines.join("\n"));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            path = %config.snapshot_progress.display(),
            error = %e,
            "could not read snapshot progress file"
        ),
    }
}

fn append_gpu_output(config: &Config, outcome: &mut CommandOutcome) {
    let path = &config.gpu_miner_output;
    let modified = match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => modified,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not stat gpu miner output file");
            return;
        }
    };
    let lines = match tail_lines(path, GPU_OUTPUT_TAIL_LINES) {
        Ok(lines) => lines,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read gpu miner output file");
            return;
        }
    };

    outcome.output.push_str("\n--- gpu miner output ---\n");
    outcome.output.push_str(&lines.join("\n"));
    outcome.output.push_str("\nlast updated: ");
    outcome.output.push_str(&format_timestamp(modified.into()));
}

/// Last `n` lines of a text file, in file order.
fn tail_lines(path: &Path, n: usize) -> io::Result<Vec<String>> {
    let text = fs::read_to_string(path)?;
    let lines: Vec<&str> = text.lines().collect();
    let skip = lines.len().saturating_sub(n);
    Ok(lines[skip..].iter().map(|s| s.to_string()).collect())
}

fn format_timestamp(stamp: OffsetDateTime) -> String {
    let local = stamp.to_offset(
        UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
    );
    local
        .format(time::macros::format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .unwrap_or_default()
}
