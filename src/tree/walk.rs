use crate::error::{Result, SitebakeError};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions scanned for placeholders unless a project adds more.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
	"py", "html", "htm", "scss", "css", "js", "md", "conf", "env", "json", "yaml", "yml", "sh",
	"txt",
];

/// Allow-list of file extensions that are scanned for placeholders.
///
/// Extensions are stored lowercase without the leading dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extensions {
	allowed: BTreeSet<String>,
}

impl Default for Extensions {
	fn default() -> Self {
		Self::new(DEFAULT_EXTENSIONS.iter().copied())
	}
}

impl Extensions {
	pub fn new<'a>(extensions: impl IntoIterator<Item = &'a str>) -> Self {
		Self {
			allowed: extensions.into_iter().filter_map(normalize).collect(),
		}
	}

	/// Add more extensions to the list.
	pub fn with_extra<'a>(mut self, extensions: impl IntoIterator<Item = &'a str>) -> Self {
		self.allowed
			.extend(extensions.into_iter().filter_map(normalize));
		self
	}

	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.allowed.iter().map(String::as_str)
	}

	/// Whether `path` should be scanned.
	///
	/// Dotfiles named after an extension (`.env`) count as that extension.
	pub fn is_eligible(&self, path: &Path) -> bool {
		if let Some(ext) = path.extension().and_then(|e| e.to_str())
			&& self.allowed.contains(&ext.to_ascii_lowercase())
		{
			return true;
		}

		path.file_name()
			.and_then(|name| name.to_str())
			.and_then(|name| name.strip_prefix('.'))
			.is_some_and(|rest| self.allowed.contains(&rest.to_ascii_lowercase()))
	}
}

fn normalize(ext: &str) -> Option<String> {
	let ext = ext.trim().trim_start_matches('.');
	if ext.is_empty() {
		None
	} else {
		Some(ext.to_ascii_lowercase())
	}
}

/// Every regular file under `root`, in a stable order.
///
/// Entries are sorted by file name at each level and symlinks are followed,
/// so repeated runs over the same tree visit files identically.
pub fn walk_files(root: &Path) -> Result<Vec<PathBuf>> {
	let mut files = Vec::new();

	for entry in WalkDir::new(root)
		.follow_links(true)
		.sort_by_file_name()
	{
		let entry = entry.map_err(|source| SitebakeError::Walk {
			path: root.to_path_buf(),
			source,
		})?;
		if entry.file_type().is_file() {
			files.push(entry.into_path());
		}
	}

	Ok(files)
}

/// Eligible files under `root`, in walk order.
pub fn walk_eligible(root: &Path, extensions: &Extensions) -> Result<Vec<PathBuf>> {
	Ok(walk_files(root)?
		.into_iter()
		.filter(|path| extensions.is_eligible(path))
		.collect())
}
