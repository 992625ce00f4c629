//! Placeholder substitution for sitebake.
//!
//! This module handles:
//! - The `(MARKER(dotted.key))` placeholder syntax
//! - Single-pass substitution of files and trees
//! - Counting and checking references without writing

pub mod placeholder;
pub mod references;
pub mod substitutor;

pub use placeholder::{Placeholder, PlaceholderSyntax};
pub use references::{UnresolvedReference, check_references, count_references};
pub use substitutor::{Expansion, Rendered, SubstitutionReport, Substitutor};
