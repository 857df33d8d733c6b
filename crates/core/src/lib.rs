//! pstree-core: process snapshot model, tree building and rendering
//!
//! This crate is OS-agnostic. It takes a flat list of process records,
//! rebuilds the parent/child forest, orders siblings and renders the result.
//!
//! # Modules
//!
//! - [`models`] - Records, snapshots, tree nodes and warnings
//! - [`builder`] - Flat records to rooted forest
//! - [`sort`] - Sibling ordering
//! - [`render`] - Text tree and JSON output
//! - [`report`] - The Report struct that aggregates one run
//!
//! # Example
//!
//! ```
//! use pstree_core::{render, Report, Snapshot, SortMode};
//!
//! let snapshot = Snapshot::from_triples([(1, 0, "init"), (2, 1, "shell")]).unwrap();
//! let report = Report::from_snapshot(&snapshot, SortMode::NumericByPid);
//! let lines = render::render(&report.forest, &render::RenderOptions::default());
//! assert_eq!(lines, vec!["└─init", "    └─shell"]);
//! ```

pub mod builder;
pub mod models;
pub mod render;
pub mod report;
pub mod sort;

// Re-export commonly used types at crate root
pub use builder::{build_forest, BuildOutcome};
pub use models::{
    Forest, ModelError, ProcessNode, ProcessRecord, Snapshot, SortMode, Warning, PRIMARY_ROOT_PID,
};
pub use report::Report;
pub use sort::sort_siblings;
