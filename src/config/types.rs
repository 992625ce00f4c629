use crate::config::document::SetPolicy;
use crate::error::{Result, SitebakeError};
use crate::substitute::{Expansion, PlaceholderSyntax};
use crate::tree::{Extensions, SitePaths};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the project file looked up by [`crate::config::discover_project`].
pub const PROJECT_FILE_NAME: &str = ".sitebake.toml";

/// Top-level configuration from a `.sitebake.toml` file.
///
/// Every path is relative to the directory holding the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProjectConfig {
	/// Template source tree copied into the build tree.
	#[serde(default = "default_source_dir")]
	pub source_dir: PathBuf,

	/// Static assets copied under `static_subpath` of the build tree.
	#[serde(default = "default_static_dir")]
	pub static_dir: PathBuf,

	/// Output tree. Deleted on `--clean`.
	#[serde(default = "default_build_dir")]
	pub build_dir: PathBuf,

	/// Where the static tree lands inside the build tree.
	#[serde(default = "default_static_subpath")]
	pub static_subpath: PathBuf,

	/// Word inside the placeholder wrapper: `(MARKER(key))`.
	#[serde(default = "default_marker")]
	pub marker: String,

	/// Extensions scanned in addition to the built-in allow-list.
	#[serde(default)]
	pub extensions: Vec<String>,

	/// How resolved values containing placeholders are handled.
	#[serde(default)]
	pub expansion: ExpansionMode,

	/// Nesting limit for recursive expansion.
	#[serde(default = "default_max_depth")]
	pub max_depth: usize,

	/// Policy for `config set` when a path crosses a scalar.
	#[serde(default)]
	pub set_policy: SetPolicyMode,

	/// Default layers, lowest priority first.
	#[serde(default = "default_layers")]
	pub layers: Vec<LayerEntry>,
}

/// A layer listed in the project file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LayerEntry {
	/// Shorthand for a required layer.
	Path(PathBuf),
	Detailed {
		path: PathBuf,
		#[serde(default = "default_required")]
		required: bool,
	},
}

impl LayerEntry {
	pub fn path(&self) -> &Path {
		match self {
			LayerEntry::Path(path) | LayerEntry::Detailed { path, .. } => path,
		}
	}

	pub fn is_required(&self) -> bool {
		match self {
			LayerEntry::Path(_) => true,
			LayerEntry::Detailed { required, .. } => *required,
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionMode {
	#[default]
	Reject,
	Literal,
	Recursive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetPolicyMode {
	#[default]
	Strict,
	Coerce,
}

impl From<SetPolicyMode> for SetPolicy {
	fn from(mode: SetPolicyMode) -> Self {
		match mode {
			SetPolicyMode::Strict => SetPolicy::Strict,
			SetPolicyMode::Coerce => SetPolicy::Coerce,
		}
	}
}

/// A loaded project configuration with the root its paths resolve against.
#[derive(Debug, Clone)]
pub struct LoadedProject {
	/// The parsed configuration (defaults when no file was found).
	pub config: ProjectConfig,

	/// Directory all relative paths resolve against.
	pub root: PathBuf,

	/// The project file, if one was found.
	pub path: Option<PathBuf>,
}

impl Default for ProjectConfig {
	fn default() -> Self {
		Self {
			source_dir: default_source_dir(),
			static_dir: default_static_dir(),
			build_dir: default_build_dir(),
			static_subpath: default_static_subpath(),
			marker: default_marker(),
			extensions: Vec::new(),
			expansion: ExpansionMode::default(),
			max_depth: default_max_depth(),
			set_policy: SetPolicyMode::default(),
			layers: default_layers(),
		}
	}
}

impl ProjectConfig {
	/// Validate settings that serde can't express.
	pub fn validate(&self) -> Result<()> {
		PlaceholderSyntax::new(&self.marker)?;

		if self.max_depth == 0 {
			return Err(SitebakeError::InvalidProjectConfig {
				setting: "max-depth".to_string(),
				reason: "must be at least 1".to_string(),
			});
		}

		if self.static_subpath.is_absolute() {
			return Err(SitebakeError::InvalidProjectConfig {
				setting: "static-subpath".to_string(),
				reason: "must be relative to the build tree".to_string(),
			});
		}

		Ok(())
	}

	/// Resolve the tree locations against `root`.
	pub fn site_paths(&self, root: &Path) -> SitePaths {
		SitePaths {
			source: root.join(&self.source_dir),
			static_files: root.join(&self.static_dir),
			build: root.join(&self.build_dir),
			static_subpath: self.static_subpath.clone(),
		}
	}

	/// The built-in allow-list extended with this project's extensions.
	pub fn extensions(&self) -> Extensions {
		Extensions::default().with_extra(self.extensions.iter().map(String::as_str))
	}

	pub fn syntax(&self) -> Result<PlaceholderSyntax> {
		PlaceholderSyntax::new(&self.marker)
	}

	pub fn expansion(&self) -> Expansion {
		match self.expansion {
			ExpansionMode::Reject => Expansion::Reject,
			ExpansionMode::Literal => Expansion::Literal,
			ExpansionMode::Recursive => Expansion::Recursive {
				max_depth: self.max_depth,
			},
		}
	}
}

fn default_source_dir() -> PathBuf {
	PathBuf::from("website_source")
}

fn default_static_dir() -> PathBuf {
	PathBuf::from("static_files")
}

fn default_build_dir() -> PathBuf {
	PathBuf::from("website_build")
}

fn default_static_subpath() -> PathBuf {
	PathBuf::from("site/static")
}

fn default_marker() -> String {
	"TOKENMARK".to_string()
}

fn default_max_depth() -> usize {
	8
}

fn default_required() -> bool {
	true
}

fn default_layers() -> Vec<LayerEntry> {
	vec![LayerEntry::Path(PathBuf::from("config.toml"))]
}
