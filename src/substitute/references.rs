use crate::config::ConfigDocument;
use crate::error::{Result, SitebakeError};
use crate::substitute::placeholder::PlaceholderSyntax;
use crate::tree::{Extensions, walk_eligible};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A placeholder whose key does not resolve to a value.
#[derive(Debug)]
pub struct UnresolvedReference {
	pub file: PathBuf,
	pub offset: usize,
	pub key: String,

	/// Why resolution failed (`KeyNotFound`, `NotAScalar`, ...).
	pub reason: SitebakeError,
}

/// Count placeholder references per key in the eligible files under `roots`.
pub fn count_references(
	roots: &[&Path],
	extensions: &Extensions,
	syntax: &PlaceholderSyntax,
) -> Result<BTreeMap<String, usize>> {
	let mut counts = BTreeMap::new();

	for file in walk_roots(roots, extensions)? {
		let content = read_text(&file)?;
		for placeholder in syntax.find_all(&content) {
			*counts.entry(placeholder.key.to_string()).or_insert(0) += 1;
		}
	}

	Ok(counts)
}

/// Every reference under `roots` that `document` can't resolve to a scalar.
///
/// Nothing is written and scanning doesn't stop at the first problem.
pub fn check_references(
	roots: &[&Path],
	extensions: &Extensions,
	syntax: &PlaceholderSyntax,
	document: &ConfigDocument,
) -> Result<Vec<UnresolvedReference>> {
	let mut unresolved = Vec::new();

	for file in walk_roots(roots, extensions)? {
		let content = read_text(&file)?;
		for placeholder in syntax.find_all(&content) {
			if let Err(reason) = document.get_scalar(placeholder.key) {
				unresolved.push(UnresolvedReference {
					file: file.clone(),
					offset: placeholder.span.start,
					key: placeholder.key.to_string(),
					reason,
				});
			}
		}
	}

	Ok(unresolved)
}

fn walk_roots(roots: &[&Path], extensions: &Extensions) -> Result<Vec<PathBuf>> {
	let mut files = Vec::new();
	for root in roots {
		files.extend(walk_eligible(root, extensions)?);
	}
	Ok(files)
}

fn read_text(path: &Path) -> Result<String> {
	std::fs::read_to_string(path).map_err(|source| SitebakeError::io("read file", path, source))
}
