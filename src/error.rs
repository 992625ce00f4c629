use std::path::PathBuf;

/// Library-level structured errors for sitebake.
///
/// Use `thiserror` for structured errors that library consumers can match on.
/// The CLI binary wraps these with `anyhow` for rich context chains.
#[derive(Debug, thiserror::Error)]
pub enum SitebakeError {
	#[error("Failed to read project file: {path}")]
	ProjectReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse project file: {path}")]
	ProjectParseError {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Invalid project setting `{setting}`: {reason}")]
	InvalidProjectConfig { setting: String, reason: String },

	#[error("Invalid placeholder marker: {marker:?}")]
	InvalidMarker {
		marker: String,
		#[source]
		source: regex::Error,
	},

	#[error("Layer file not found: {path}")]
	LayerNotFound { path: PathBuf },

	#[error("Failed to read layer file: {path}")]
	LayerReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse layer file: {path}")]
	LayerParseError {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Failed to serialize layer file: {path}")]
	LayerWriteError {
		path: PathBuf,
		#[source]
		source: toml::ser::Error,
	},

	#[error("Unsupported {kind} value for `{key}` in {path}")]
	UnsupportedValue {
		path: PathBuf,
		key: String,
		kind: &'static str,
	},

	#[error("Invalid dotted key: {key:?}")]
	InvalidKey { key: String },

	#[error("Key not found: `{key}` (missing segment `{missing}`)")]
	KeyNotFound { key: String, missing: String },

	#[error("Key `{key}` is a table, not a value")]
	NotAScalar { key: String },

	#[error("Cannot set `{key}`: segment `{segment}` holds a value, not a table")]
	TableScalarConflict { key: String, segment: String },

	#[error("Unresolved placeholder `{key}` in {file} at byte {offset}")]
	UnresolvedPlaceholder {
		file: PathBuf,
		offset: usize,
		key: String,
		#[source]
		source: Box<SitebakeError>,
	},

	#[error("Value of `{key}` leaves a placeholder in the output ({file} at byte {offset})")]
	PlaceholderInValue {
		file: PathBuf,
		offset: usize,
		key: String,
	},

	#[error("Cyclic substitution in {file} at byte {offset}: {chain}")]
	CyclicSubstitution {
		file: PathBuf,
		offset: usize,
		chain: String,
	},

	#[error("{role} tree not found: {path}")]
	TreeNotFound { role: &'static str, path: PathBuf },

	#[error("Build tree {build} overlaps {role} tree {other}")]
	OverlappingTrees {
		role: &'static str,
		build: PathBuf,
		other: PathBuf,
	},

	#[error("Failed to {operation}: {path}")]
	Io {
		operation: &'static str,
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to walk directory: {path}")]
	Walk {
		path: PathBuf,
		#[source]
		source: walkdir::Error,
	},
}

impl SitebakeError {
	/// Build an [`SitebakeError::Io`] for `operation` on `path`.
	pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		SitebakeError::Io {
			operation,
			path: path.into(),
			source,
		}
	}
}

/// Result type alias using SitebakeError.
pub type Result<T> = std::result::Result<T, SitebakeError>;
