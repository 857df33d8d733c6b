//! pstree-platform-linux: snapshot collection for pstree
//!
//! Reads `/proc/<pid>/stat` for every numeric entry under the process
//! directory and turns each into a [`pstree_core::ProcessRecord`].

pub mod error;
pub mod proc_scan;

pub use error::*;
pub use proc_scan::*;
