//! Configuration loading and merging for sitebake.
//!
//! This module handles:
//! - The dotted-key configuration document
//! - Layer file parsing and left-fold merging
//! - `.sitebake.toml` project discovery
//! - Writing values back into layer files

pub mod cascade;
pub mod document;
pub mod parser;
pub mod types;
pub mod writer;

pub use cascade::{
	LayerSource, LoadedLayer, discover_project, load_layer, load_layers, load_merged_layers,
	merge_layers, project_layers,
};
pub use document::{ConfigDocument, Node, Scalar, SetPolicy, Table};
pub use parser::{parse_layer_file, parse_layer_str, parse_project_file, parse_project_str};
pub use types::{
	ExpansionMode, LayerEntry, LoadedProject, PROJECT_FILE_NAME, ProjectConfig, SetPolicyMode,
};
pub use writer::{Assignment, render_layer, set_layer_values, write_layer_file};
