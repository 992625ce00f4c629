use crate::config::document::ConfigDocument;
use crate::config::parser::{parse_layer_file, parse_project_file};
use crate::config::types::{LoadedProject, PROJECT_FILE_NAME, ProjectConfig};
use crate::error::{Result, SitebakeError};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One configuration source in a layer list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSource {
	/// Where the layer is read from.
	pub path: PathBuf,

	/// Whether a missing file is an error rather than a skip.
	pub required: bool,
}

impl LayerSource {
	pub fn required(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			required: true,
		}
	}

	pub fn optional(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			required: false,
		}
	}
}

/// A loaded layer with its source path for debugging/display.
#[derive(Debug, Clone)]
pub struct LoadedLayer {
	/// The parsed document.
	pub document: ConfigDocument,

	/// The path this layer was loaded from.
	pub path: PathBuf,
}

/// Discover the project file by walking up from `start_dir`.
///
/// The first `.sitebake.toml` found wins and its directory becomes the
/// project root. Without one, `start_dir` is the root and defaults apply.
pub fn discover_project(start_dir: &Path) -> Result<LoadedProject> {
	let mut current_dir = start_dir.to_path_buf();

	loop {
		let project_path = current_dir.join(PROJECT_FILE_NAME);

		if project_path.is_file() {
			let config = parse_project_file(&project_path)?;
			debug!(path = %project_path.display(), "loaded project file");
			return Ok(LoadedProject {
				config,
				root: current_dir,
				path: Some(project_path),
			});
		}

		// Move to parent directory
		if let Some(parent) = current_dir.parent() {
			current_dir = parent.to_path_buf();
		} else {
			break;
		}
	}

	debug!(root = %start_dir.display(), "no project file found, using defaults");
	Ok(LoadedProject {
		config: ProjectConfig::default(),
		root: start_dir.to_path_buf(),
		path: None,
	})
}

/// Layer sources named by the project file, resolved against its root.
pub fn project_layers(project: &LoadedProject) -> Vec<LayerSource> {
	project
		.config
		.layers
		.iter()
		.map(|entry| LayerSource {
			path: project.root.join(entry.path()),
			required: entry.is_required(),
		})
		.collect()
}

/// Load a single layer. A missing optional layer yields `None`.
pub fn load_layer(source: &LayerSource) -> Result<Option<LoadedLayer>> {
	if !source.path.exists() {
		if source.required {
			return Err(SitebakeError::LayerNotFound {
				path: source.path.clone(),
			});
		}
		warn!(path = %source.path.display(), "skipping missing optional layer");
		return Ok(None);
	}

	let document = parse_layer_file(&source.path)?;
	debug!(path = %source.path.display(), keys = document.leaf_keys().len(), "loaded layer");

	Ok(Some(LoadedLayer {
		document,
		path: source.path.clone(),
	}))
}

/// Load every layer in order, dropping absent optional ones.
pub fn load_layers(sources: &[LayerSource]) -> Result<Vec<LoadedLayer>> {
	let mut layers = Vec::with_capacity(sources.len());
	for source in sources {
		if let Some(layer) = load_layer(source)? {
			layers.push(layer);
		}
	}
	Ok(layers)
}

/// Fold documents into one, lowest priority first.
///
/// Equivalent to `docs[0].merge_from(docs[1])`, then `docs[2]`, and so on.
pub fn merge_layers<I>(documents: I) -> ConfigDocument
where
	I: IntoIterator<Item = ConfigDocument>,
{
	documents
		.into_iter()
		.fold(ConfigDocument::new(), |mut merged, layer| {
			merged.merge_from(layer);
			merged
		})
}

/// Convenience function to load and merge a layer list.
pub fn load_merged_layers(sources: &[LayerSource]) -> Result<ConfigDocument> {
	let layers = load_layers(sources)?;
	Ok(merge_layers(layers.into_iter().map(|layer| layer.document)))
}
