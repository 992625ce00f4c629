use crate::error::{Result, SitebakeError};
use crate::tree::walk::walk_files;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Absolute locations of the trees involved in a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
	/// Template source tree.
	pub source: PathBuf,

	/// Static assets tree.
	pub static_files: PathBuf,

	/// Output tree, the only one ever modified.
	pub build: PathBuf,

	/// Location of the static tree relative to `build`.
	pub static_subpath: PathBuf,
}

impl SitePaths {
	/// Where the static tree is copied to.
	pub fn static_root(&self) -> PathBuf {
		self.build.join(&self.static_subpath)
	}

	/// The trees copied into the build, source first.
	pub fn inputs(&self) -> [&Path; 2] {
		[self.source.as_path(), self.static_files.as_path()]
	}

	/// Check that the inputs exist and that the build tree is disjoint from them.
	///
	/// Paths are compared after resolving `..` and symlinks, so an alias of
	/// an input tree is never accepted as the build tree.
	pub fn validate(&self) -> Result<()> {
		let build = resolve_path(&self.build);
		for (role, input) in [("source", &self.source), ("static", &self.static_files)] {
			let resolved = resolve_path(input);
			if resolved.starts_with(&build) || build.starts_with(&resolved) {
				return Err(SitebakeError::OverlappingTrees {
					role,
					build: self.build.clone(),
					other: input.clone(),
				});
			}
			if !input.is_dir() {
				return Err(SitebakeError::TreeNotFound {
					role,
					path: input.clone(),
				});
			}
		}
		Ok(())
	}
}

/// `path` with symlinks resolved as far as it exists and `.`/`..` removed
/// from the rest.
fn resolve_path(path: &Path) -> PathBuf {
	let mut existing = path;
	let mut missing = Vec::new();
	let mut resolved = loop {
		if let Ok(canonical) = existing.canonicalize() {
			break canonical;
		}
		match (existing.parent(), existing.components().next_back()) {
			(Some(parent), Some(last)) => {
				missing.push(last);
				existing = parent;
			}
			_ => break PathBuf::new(),
		}
	};

	for component in missing.into_iter().rev() {
		match component {
			Component::CurDir => {}
			Component::ParentDir => {
				resolved.pop();
			}
			other => resolved.push(other),
		}
	}
	resolved
}

/// What [`assemble`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyReport {
	/// Whether an existing build tree was deleted first.
	pub cleaned: bool,

	/// Files copied from both trees.
	pub files_copied: usize,
}

/// Materialize the build tree.
///
/// With `clean`, the build tree is deleted first. The source tree is then
/// overlaid onto it, followed by the static tree under its subpath. Files
/// that only exist in the build tree survive. Nothing is rolled back on
/// failure.
pub fn assemble(paths: &SitePaths, clean: bool) -> Result<AssemblyReport> {
	paths.validate()?;

	let mut report = AssemblyReport::default();

	if clean {
		report.cleaned = clean_tree(&paths.build)?;
	}

	report.files_copied += copy_overlay(&paths.source, &paths.build)?;
	report.files_copied += copy_overlay(&paths.static_files, &paths.static_root())?;

	info!(
		build = %paths.build.display(),
		files = report.files_copied,
		cleaned = report.cleaned,
		"assembled build tree"
	);

	Ok(report)
}

/// Delete `path` recursively. Returns whether anything was removed.
pub fn clean_tree(path: &Path) -> Result<bool> {
	if !path.exists() {
		return Ok(false);
	}

	fs::remove_dir_all(path).map_err(|source| SitebakeError::io("remove directory", path, source))?;
	debug!(path = %path.display(), "removed build tree");
	Ok(true)
}

/// Copy every file under `from` to the same relative path under `to`.
///
/// Directories are created as needed and existing files are overwritten.
/// Returns the number of files copied.
pub fn copy_overlay(from: &Path, to: &Path) -> Result<usize> {
	fs::create_dir_all(to).map_err(|source| SitebakeError::io("create directory", to, source))?;

	let mut copied = 0;
	for file in walk_files(from)? {
		// walkdir yields paths joined onto `from`
		let Ok(relative) = file.strip_prefix(from) else {
			continue;
		};
		let target = to.join(relative);

		if let Some(parent) = target.parent() {
			fs::create_dir_all(parent)
				.map_err(|source| SitebakeError::io("create directory", parent, source))?;
		}
		fs::copy(&file, &target).map_err(|source| SitebakeError::io("copy file", &file, source))?;
		copied += 1;
	}

	debug!(from = %from.display(), to = %to.display(), files = copied, "copied tree");
	Ok(copied)
}
