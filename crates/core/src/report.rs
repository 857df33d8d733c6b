//! Report structure for one pstree run

use crate::builder::build_forest;
use crate::models::{Forest, Snapshot, SortMode, Warning};
use crate::sort::sort_siblings;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Built and ordered forest for one snapshot, with everything that went wrong
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    /// When the underlying snapshot was taken
    #[serde(with = "time::serde::rfc3339::option")]
    pub taken_at: Option<OffsetDateTime>,
    /// The process trees
    pub forest: Forest,
    /// Anomalies found while building
    pub warnings: Vec<Warning>,
}

impl Report {
    /// Build, then sort, the forest for a snapshot
    pub fn from_snapshot(snapshot: &Snapshot, mode: SortMode) -> Self {
        let outcome = build_forest(&snapshot.records);
        let mut forest = outcome.forest;
        sort_siblings(&mut forest, mode);
        Self {
            taken_at: snapshot.taken_at,
            forest,
            warnings: outcome.warnings,
        }
    }

    /// Check if any warnings were raised
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Number of processes in the forest
    pub fn process_count(&self) -> usize {
        self.forest.node_count()
    }
}
