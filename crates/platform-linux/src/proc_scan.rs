//! Process snapshot from the `/proc` filesystem
//!
//! Provides a point-in-time snapshot of all processes with their PIDs, PPIDs
//! and names. Entries that vanish or cannot be parsed mid-scan are skipped.

use crate::error::{CollectError, CollectResult};
use pstree_core::{ProcessRecord, Snapshot};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Default location of the process information directory
pub const PROC_ROOT: &str = "/proc";

/// Create a snapshot of all running processes
#[cfg(target_os = "linux")]
pub fn list_processes() -> CollectResult<Snapshot> {
    list_processes_in(Path::new(PROC_ROOT))
}

/// Stub for platforms without `/proc`
#[cfg(not(target_os = "linux"))]
pub fn list_processes() -> CollectResult<Snapshot> {
    Err(CollectError::UnsupportedPlatform)
}

/// Create a snapshot from a directory laid out like `/proc`
///
/// Only the listing of `root` itself is fatal. Per-process failures are
/// expected on a live system (processes exit between listing and reading)
/// and are skipped.
pub fn list_processes_in(root: &Path) -> CollectResult<Snapshot> {
    let entries = fs::read_dir(root).map_err(|source| CollectError::ProcUnavailable {
        path: root.to_path_buf(),
        source,
    })?;

    let mut snapshot = Snapshot::now();
    let mut skipped = 0usize;

    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(pid) = file_name.to_str().and_then(parse_pid_dir) else {
            continue;
        };

        let stat_path = entry.path().join("stat");
        // comm is raw bytes from the kernel and need not be UTF-8
        let bytes = match fs::read(&stat_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(pid, error = %e, "process vanished or unreadable");
                skipped += 1;
                continue;
            }
        };
        let contents = String::from_utf8_lossy(&bytes);

        match parse_stat(&contents) {
            Some(record) if record.pid == pid => {
                // parse_stat never yields pid 0, so push cannot fail
                if snapshot.push(record).is_err() {
                    skipped += 1;
                }
            }
            Some(record) => {
                debug!(pid, stat_pid = record.pid, "stat pid does not match directory");
                skipped += 1;
            }
            None => {
                debug!(pid, "malformed stat line");
                skipped += 1;
            }
        }
    }

    info!(
        root = %root.display(),
        processes = snapshot.len(),
        skipped,
        "collected process snapshot"
    );

    Ok(snapshot)
}

/// Parse a directory name as a positive PID
fn parse_pid_dir(name: &str) -> Option<u32> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse::<u32>().ok().filter(|&pid| pid > 0)
}

/// Parse the contents of `/proc/<pid>/stat`
///
/// Format: `pid (comm) state ppid ...`. The command name may itself contain
/// spaces and parentheses, so it runs from the first `(` to the last `)`.
pub fn parse_stat(contents: &str) -> Option<ProcessRecord> {
    let open = contents.find('(')?;
    let close = contents.rfind(')')?;
    if close < open {
        return None;
    }

    let pid = contents[..open].trim().parse::<u32>().ok()?;
    let name = &contents[open + 1..close];

    // fields[0] = state, fields[1] = ppid
    let mut fields = contents[close + 1..].split_whitespace();
    let _state = fields.next()?;
    let ppid = fields.next()?.parse::<u32>().ok()?;

    ProcessRecord::new(pid, ppid, name).ok()
}
