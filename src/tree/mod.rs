//! Build tree assembly for sitebake.
//!
//! This module handles:
//! - Cleaning the build tree
//! - Overlaying the source and static trees onto it
//! - Deterministic file walks and the eligible-extension allow-list

pub mod assembler;
pub mod walk;

pub use assembler::{AssemblyReport, SitePaths, assemble, clean_tree, copy_overlay};
pub use walk::{DEFAULT_EXTENSIONS, Extensions, walk_eligible, walk_files};
