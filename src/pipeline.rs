//! The build pipeline: assemble, merge, substitute.

use crate::config::{LayerSource, LoadedProject, load_layers, merge_layers};
use crate::error::Result;
use crate::substitute::{Expansion, PlaceholderSyntax, SubstitutionReport, Substitutor};
use crate::tree::{AssemblyReport, Extensions, SitePaths, assemble};
use tracing::info;

/// Substitution settings for a build.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
	pub extensions: Extensions,
	pub syntax: PlaceholderSyntax,
	pub expansion: Expansion,
}

/// What a successful [`BuildPipeline::run`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
	pub assembly: AssemblyReport,

	/// Layers actually merged (absent optional layers excluded).
	pub layers: usize,

	pub substitution: SubstitutionReport,
}

/// Assembles the build tree, merges the layers and substitutes placeholders.
///
/// Steps run strictly in order and the first error aborts the run, leaving
/// the build tree as far as it got. Running two pipelines against the same
/// build tree at once is not supported; callers must serialize runs.
#[derive(Debug, Clone)]
pub struct BuildPipeline {
	paths: SitePaths,
	options: BuildOptions,
}

impl BuildPipeline {
	pub fn new(paths: SitePaths, options: BuildOptions) -> Self {
		Self { paths, options }
	}

	/// Build a pipeline from a project's settings.
	pub fn from_project(project: &LoadedProject) -> Result<Self> {
		let config = &project.config;
		let options = BuildOptions {
			extensions: config.extensions(),
			syntax: config.syntax()?,
			expansion: config.expansion(),
		};
		Ok(Self::new(config.site_paths(&project.root), options))
	}

	pub fn paths(&self) -> &SitePaths {
		&self.paths
	}

	pub fn options(&self) -> &BuildOptions {
		&self.options
	}

	/// Run the pipeline with `layers` ordered lowest priority first.
	pub fn run(&self, layers: &[LayerSource], clean: bool) -> Result<BuildReport> {
		let assembly = assemble(&self.paths, clean)?;

		let loaded = load_layers(layers)?;
		let layer_count = loaded.len();
		let merged = merge_layers(loaded.into_iter().map(|layer| layer.document));

		let substitutor = Substitutor::new(&merged, &self.options.syntax, self.options.expansion);
		let substitution = substitutor.substitute_tree(&self.paths.build, &self.options.extensions)?;

		info!(
			build = %self.paths.build.display(),
			layers = layer_count,
			files = substitution.files_rewritten,
			substitutions = substitution.substitutions,
			"build finished"
		);

		Ok(BuildReport {
			assembly,
			layers: layer_count,
			substitution,
		})
	}
}
