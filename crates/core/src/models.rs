//! Core domain models for pstree
//!
//! These types are OS-agnostic: the collector produces [`ProcessRecord`]s,
//! the builder turns them into owned [`ProcessNode`] trees.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

/// PID of the conventional init/supervisor process
pub const PRIMARY_ROOT_PID: u32 = 1;

/// Errors raised while constructing model values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// PIDs must be positive
    #[error("invalid pid {pid} for process \"{name}\"")]
    InvalidPid { pid: u32, name: String },
}

/// One observed process at snapshot time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    /// Process ID (unique key, never 0)
    pub pid: u32,
    /// Parent process ID; 0 or equal to `pid` means no parent
    pub ppid: u32,
    /// Short display name (executable name without parentheses)
    pub name: String,
}

impl ProcessRecord {
    /// Create a record, rejecting a zero PID
    pub fn new(pid: u32, ppid: u32, name: impl Into<String>) -> Result<Self, ModelError> {
        let name = name.into();
        if pid == 0 {
            return Err(ModelError::InvalidPid { pid, name });
        }
        Ok(Self { pid, ppid, name })
    }

    /// Whether this record declares no parent (kernel root or self-parented)
    pub fn declares_no_parent(&self) -> bool {
        self.ppid == 0 || self.ppid == self.pid
    }
}

/// All records observed at one instant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the snapshot was taken (absent for synthetic snapshots)
    #[serde(with = "time::serde::rfc3339::option")]
    pub taken_at: Option<OffsetDateTime>,
    /// Records in collector order
    pub records: Vec<ProcessRecord>,
}

impl Snapshot {
    /// Create an empty snapshot stamped with the current time
    pub fn now() -> Self {
        Self {
            taken_at: Some(OffsetDateTime::now_utc()),
            records: Vec::new(),
        }
    }

    /// Build a synthetic snapshot from `(pid, ppid, name)` triples
    pub fn from_triples<'a, I>(triples: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = (u32, u32, &'a str)>,
    {
        let mut snapshot = Self::default();
        for (pid, ppid, name) in triples {
            snapshot.push(ProcessRecord::new(pid, ppid, name)?)?;
        }
        Ok(snapshot)
    }

    /// Append a record after checking its shape
    pub fn push(&mut self, record: ProcessRecord) -> Result<(), ModelError> {
        if record.pid == 0 {
            return Err(ModelError::InvalidPid {
                pid: record.pid,
                name: record.name,
            });
        }
        self.records.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A process in the built tree, owning its children
///
/// Dropping is iterative, so arbitrarily deep chains are safe to free. The
/// derived `Clone`, `PartialEq` and serde impls still recurse once per level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessNode {
    pub pid: u32,
    pub ppid: u32,
    pub name: String,
    /// Child processes, in builder or sorter order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ProcessNode>,
}

impl ProcessNode {
    /// Create a childless node from a record
    pub fn from_record(record: &ProcessRecord) -> Self {
        Self {
            pid: record.pid,
            ppid: record.ppid,
            name: record.name.clone(),
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including this one
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Find a node by PID in this subtree
    pub fn find(&self, pid: u32) -> Option<&ProcessNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.pid == pid {
                return Some(node);
            }
            stack.extend(node.children.iter());
        }
        None
    }
}

impl Drop for ProcessNode {
    fn drop(&mut self) {
        // Detach descendants onto a heap stack so no drop recurses into a child
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Independently rooted process trees
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Forest {
    pub roots: Vec<ProcessNode>,
}

impl Forest {
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of nodes reachable from all roots
    pub fn node_count(&self) -> usize {
        self.roots.iter().map(ProcessNode::subtree_len).sum()
    }

    /// Find a node by PID anywhere in the forest
    pub fn find(&self, pid: u32) -> Option<&ProcessNode> {
        self.roots.iter().find_map(|root| root.find(pid))
    }

    /// The tree rooted at the primary root, if present
    pub fn primary_root(&self) -> Option<&ProcessNode> {
        self.roots.iter().find(|root| root.pid == PRIMARY_ROOT_PID)
    }
}

/// How siblings are ordered before rendering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    /// Whatever order the collector produced
    #[default]
    Insertion,
    /// Ascending by PID
    NumericByPid,
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortMode::Insertion => write!(f, "insertion"),
            SortMode::NumericByPid => write!(f, "numeric-by-pid"),
        }
    }
}

/// Recoverable anomalies found while building the forest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details", rename_all = "snake_case")]
pub enum Warning {
    /// The snapshot was empty
    NoRecords,
    /// Records exist but the primary root is not among them
    NoRootFound { expected_pid: u32 },
    /// A later record reused a PID; the first one was kept
    DuplicatePid {
        pid: u32,
        kept: String,
        dropped: String,
    },
    /// A parent chain looped back; this record was made a root
    CycleBroken { pid: u32, ppid: u32 },
    /// The parent was not in the snapshot (likely exited)
    ParentMissing { pid: u32, ppid: u32 },
    /// A record with PID 0 was skipped
    InvalidRecord { name: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::NoRecords => write!(f, "No processes in snapshot"),
            Warning::NoRootFound { expected_pid } => {
                write!(
                    f,
                    "Root process (PID {}) not found; showing all top-level processes",
                    expected_pid
                )
            }
            Warning::DuplicatePid { pid, kept, dropped } => {
                write!(
                    f,
                    "Duplicate PID {}: kept \"{}\", dropped \"{}\"",
                    pid, kept, dropped
                )
            }
            Warning::CycleBroken { pid, ppid } => {
                write!(
                    f,
                    "Parent cycle through PID {} (parent {}); shown as a root",
                    pid, ppid
                )
            }
            Warning::ParentMissing { pid, ppid } => {
                write!(f, "Parent (PID {}) of PID {} has exited", ppid, pid)
            }
            Warning::InvalidRecord { name } => {
                write!(f, "Skipped record \"{}\" with PID 0", name)
            }
        }
    }
}
