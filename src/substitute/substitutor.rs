use crate::config::ConfigDocument;
use crate::error::{Result, SitebakeError};
use crate::substitute::placeholder::PlaceholderSyntax;
use crate::tree::{Extensions, walk_eligible};
use std::ops::Range;
use std::path::Path;
use tracing::{debug, info};

/// How a resolved value that itself contains placeholder syntax is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Expansion {
	/// Fail with [`SitebakeError::PlaceholderInValue`].
	#[default]
	Reject,
	/// Insert the value verbatim; it is never rescanned.
	Literal,
	/// Expand nested placeholders up to `max_depth` levels deep.
	Recursive { max_depth: usize },
}

/// Result of substituting a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
	pub content: String,

	/// Top-level placeholders replaced.
	pub substitutions: usize,
}

/// Where a value landed in the rendered text.
struct Insertion<'k> {
	range: Range<usize>,
	key: &'k str,

	/// Offset of the replaced placeholder in the input.
	offset: usize,
}

/// Totals for a tree pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubstitutionReport {
	pub files_scanned: usize,
	pub files_rewritten: usize,
	pub substitutions: usize,
}

/// Replaces placeholders with values from a merged document.
///
/// Each text is processed in a single left-to-right pass. Inserted values
/// are not rescanned unless [`Expansion::Recursive`] is selected.
#[derive(Debug)]
pub struct Substitutor<'a> {
	document: &'a ConfigDocument,
	syntax: &'a PlaceholderSyntax,
	expansion: Expansion,
}

impl<'a> Substitutor<'a> {
	pub fn new(
		document: &'a ConfigDocument,
		syntax: &'a PlaceholderSyntax,
		expansion: Expansion,
	) -> Self {
		Self {
			document,
			syntax,
			expansion,
		}
	}

	/// Substitute every placeholder in `content`.
	///
	/// `origin` is only used for error reporting. Unless the policy is
	/// [`Expansion::Literal`], the finished text must not contain a
	/// placeholder, including one formed by a value and its surroundings.
	pub fn render_str(&self, content: &str, origin: &Path) -> Result<Rendered> {
		let mut out = String::with_capacity(content.len());
		let mut last = 0;
		let mut insertions = Vec::new();
		let mut chain = Vec::new();

		for placeholder in self.syntax.find_all(content) {
			let offset = placeholder.span.start;
			let value = self.resolve(placeholder.key, origin, offset, &mut chain)?;
			debug!(file = %origin.display(), key = placeholder.key, "replacing placeholder");

			out.push_str(&content[last..offset]);
			let start = out.len();
			out.push_str(&value);
			insertions.push(Insertion {
				range: start..out.len(),
				key: placeholder.key,
				offset,
			});
			last = placeholder.span.end;
		}
		out.push_str(&content[last..]);

		if self.expansion != Expansion::Literal {
			self.check_spliced(&out, &insertions, origin)?;
		}

		Ok(Rendered {
			content: out,
			substitutions: insertions.len(),
		})
	}

	/// Substitute placeholders in one file, rewriting it if anything changed.
	///
	/// Returns the number of placeholders replaced.
	pub fn substitute_file(&self, path: &Path) -> Result<usize> {
		let content = std::fs::read_to_string(path)
			.map_err(|source| SitebakeError::io("read file", path, source))?;

		let rendered = self.render_str(&content, path)?;
		if rendered.substitutions == 0 {
			return Ok(0);
		}

		std::fs::write(path, rendered.content)
			.map_err(|source| SitebakeError::io("write file", path, source))?;
		info!(file = %path.display(), count = rendered.substitutions, "substituted placeholders");

		Ok(rendered.substitutions)
	}

	/// Substitute every eligible file under `root`, stopping at the first error.
	///
	/// Files rewritten before the failure stay rewritten.
	pub fn substitute_tree(
		&self,
		root: &Path,
		extensions: &Extensions,
	) -> Result<SubstitutionReport> {
		let mut report = SubstitutionReport::default();

		for file in walk_eligible(root, extensions)? {
			report.files_scanned += 1;
			let count = self.substitute_file(&file)?;
			if count > 0 {
				report.files_rewritten += 1;
				report.substitutions += count;
			}
		}

		Ok(report)
	}

	/// Fail if a placeholder survives in `out`.
	///
	/// Unreplaced source text can't hold a whole placeholder, so any match
	/// involves an inserted value; the first insertion touching it is blamed.
	fn check_spliced(
		&self,
		out: &str,
		insertions: &[Insertion<'_>],
		origin: &Path,
	) -> Result<()> {
		let Some(token) = self.syntax.find_all(out).next() else {
			return Ok(());
		};
		let span = token.span;
		let culprit = insertions
			.iter()
			.find(|insertion| {
				insertion.range.start < span.end && span.start < insertion.range.end
			})
			.or_else(|| {
				insertions
					.iter()
					.rev()
					.find(|insertion| insertion.range.start <= span.start)
			})
			.or(insertions.first());

		match culprit {
			Some(insertion) => Err(SitebakeError::PlaceholderInValue {
				file: origin.to_path_buf(),
				offset: insertion.offset,
				key: insertion.key.to_string(),
			}),
			None => Ok(()),
		}
	}

	/// Resolve `key` to the text that replaces its placeholder.
	fn resolve(
		&self,
		key: &str,
		origin: &Path,
		offset: usize,
		chain: &mut Vec<String>,
	) -> Result<String> {
		let value = self
			.document
			.get_scalar(key)
			.map_err(|source| SitebakeError::UnresolvedPlaceholder {
				file: origin.to_path_buf(),
				offset,
				key: key.to_string(),
				source: Box::new(source),
			})?
			.to_string();

		match self.expansion {
			Expansion::Literal => Ok(value),
			Expansion::Reject => {
				if self.syntax.contains(&value) {
					return Err(SitebakeError::PlaceholderInValue {
						file: origin.to_path_buf(),
						offset,
						key: key.to_string(),
					});
				}
				Ok(value)
			}
			Expansion::Recursive { max_depth } => {
				if chain.iter().any(|seen| seen == key) || chain.len() >= max_depth {
					let mut keys = chain.clone();
					keys.push(key.to_string());
					return Err(SitebakeError::CyclicSubstitution {
						file: origin.to_path_buf(),
						offset,
						chain: keys.join(" -> "),
					});
				}

				chain.push(key.to_string());
				let expanded = self.expand_nested(&value, origin, offset, chain);
				chain.pop();
				expanded
			}
		}
	}

	/// Expand placeholders inside a resolved value. Errors point at the
	/// outermost placeholder's offset in the file.
	fn expand_nested(
		&self,
		value: &str,
		origin: &Path,
		offset: usize,
		chain: &mut Vec<String>,
	) -> Result<String> {
		let mut out = String::with_capacity(value.len());
		let mut last = 0;

		for placeholder in self.syntax.find_all(value) {
			out.push_str(&value[last..placeholder.span.start]);
			out.push_str(&self.resolve(placeholder.key, origin, offset, chain)?);
			last = placeholder.span.end;
		}
		out.push_str(&value[last..]);

		Ok(out)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::parse_layer_str;
	use std::fs;
	use std::path::PathBuf;

	fn doc(content: &str) -> ConfigDocument {
		parse_layer_str(content, Path::new("test.toml")).unwrap()
	}

	fn render(document: &ConfigDocument, expansion: Expansion, text: &str) -> Result<Rendered> {
		let syntax = PlaceholderSyntax::default();
		Substitutor::new(document, &syntax, expansion).render_str(text, Path::new("page.html"))
	}

	#[test]
	fn test_render_simple() {
		let d = doc("a = \"1\"\n");
		let rendered = render(&d, Expansion::Reject, "Hello (TOKENMARK(a))!").unwrap();

		assert_eq!(rendered.content, "Hello 1!");
		assert_eq!(rendered.substitutions, 1);
	}

	#[test]
	fn test_render_verbatim_value() {
		let d = doc("[t]\nv = \"  spaced \\\"quoted\\\" $1 \\\\ \"\n");
		let rendered = render(&d, Expansion::Reject, "[(TOKENMARK(t.v))]").unwrap();

		assert_eq!(rendered.content, "[  spaced \"quoted\" $1 \\ ]");
	}

	#[test]
	fn test_render_non_string_scalars() {
		let d = doc("port = 8000\ndebug = false\n");
		let rendered = render(
			&d,
			Expansion::Reject,
			"PORT=(TOKENMARK(port))\nDEBUG=(TOKENMARK(debug))\n",
		)
		.unwrap();

		assert_eq!(rendered.content, "PORT=8000\nDEBUG=false\n");
	}

	#[test]
	fn test_render_without_placeholders_is_unchanged() {
		let d = ConfigDocument::new();
		let text = "no tokens (here) ((at)) all";
		let rendered = render(&d, Expansion::Reject, text).unwrap();

		assert_eq!(rendered.content, text);
		assert_eq!(rendered.substitutions, 0);
	}

	#[test]
	fn test_render_missing_key_reports_offset() {
		let d = doc("a = \"1\"\n");
		let result = render(&d, Expansion::Reject, "ok (TOKENMARK(a)) (TOKENMARK(missing.key))");

		match result.unwrap_err() {
			SitebakeError::UnresolvedPlaceholder {
				file,
				offset,
				key,
				source,
			} => {
				assert_eq!(file, PathBuf::from("page.html"));
				assert_eq!(offset, 18);
				assert_eq!(key, "missing.key");
				assert!(matches!(*source, SitebakeError::KeyNotFound { .. }));
			}
			e => panic!("Expected UnresolvedPlaceholder, got {e:?}"),
		}
	}

	#[test]
	fn test_render_table_is_not_a_value() {
		let d = doc("[appearance]\ncolor = \"red\"\n");
		let result = render(&d, Expansion::Reject, "(TOKENMARK(appearance))");

		match result.unwrap_err() {
			SitebakeError::UnresolvedPlaceholder { source, .. } => {
				assert!(matches!(*source, SitebakeError::NotAScalar { .. }));
			}
			e => panic!("Expected UnresolvedPlaceholder, got {e:?}"),
		}
	}

	#[test]
	fn test_reject_value_containing_placeholder() {
		let d = doc("a = \"(TOKENMARK(a))\"\n");
		let result = render(&d, Expansion::Reject, "x (TOKENMARK(a))");

		match result.unwrap_err() {
			SitebakeError::PlaceholderInValue { key, offset, .. } => {
				assert_eq!(key, "a");
				assert_eq!(offset, 2);
			}
			e => panic!("Expected PlaceholderInValue, got {e:?}"),
		}
	}

	#[test]
	fn test_reject_value_forming_placeholder_with_neighbours() {
		let d = doc("open = \"(TOKENMARK(\"\nb = \"B\"\n");
		let result = render(&d, Expansion::Reject, "(TOKENMARK(open))b))");

		match result.unwrap_err() {
			SitebakeError::PlaceholderInValue { key, offset, .. } => {
				assert_eq!(key, "open");
				assert_eq!(offset, 0);
			}
			e => panic!("Expected PlaceholderInValue, got {e:?}"),
		}
	}

	#[test]
	fn test_reject_value_completing_preceding_text() {
		let d = doc("tail = \"TOKENMARK(b))\"\nb = \"B\"\n");
		let result = render(&d, Expansion::Reject, "((TOKENMARK(tail))");

		match result.unwrap_err() {
			SitebakeError::PlaceholderInValue { key, offset, .. } => {
				assert_eq!(key, "tail");
				assert_eq!(offset, 1);
			}
			e => panic!("Expected PlaceholderInValue, got {e:?}"),
		}
	}

	#[test]
	fn test_recursive_value_forming_placeholder_with_neighbours() {
		let d = doc("open = \"(TOKENMARK(\"\nb = \"B\"\n");
		let result = render(&d, Expansion::Recursive { max_depth: 4 }, "(TOKENMARK(open))b))");

		assert!(matches!(
			result,
			Err(SitebakeError::PlaceholderInValue { .. })
		));
	}

	#[test]
	fn test_literal_self_reference_terminates() {
		let d = doc("a = \"(TOKENMARK(a))\"\n");
		let rendered = render(&d, Expansion::Literal, "x (TOKENMARK(a)) y").unwrap();

		assert_eq!(rendered.content, "x (TOKENMARK(a)) y");
		assert_eq!(rendered.substitutions, 1);
	}

	#[test]
	fn test_literal_value_is_opaque_to_neighbours() {
		// Literal output is never rescanned, even when it forms a token.
		let d = doc("open = \"(TOKENMARK(\"\nb = \"B\"\n");
		let rendered = render(&d, Expansion::Literal, "(TOKENMARK(open))b))").unwrap();

		assert_eq!(rendered.content, "(TOKENMARK(b))");
	}

	#[test]
	fn test_recursive_expansion() {
		let d = doc(
			r#"
domain = "example.org"
[urls]
home = "https://(TOKENMARK(domain))/"
wiki = "(TOKENMARK(urls.home))wiki/"
"#,
		);
		let rendered = render(
			&d,
			Expansion::Recursive { max_depth: 8 },
			"(TOKENMARK(urls.wiki))",
		)
		.unwrap();

		assert_eq!(rendered.content, "https://example.org/wiki/");
		assert_eq!(rendered.substitutions, 1);
	}

	#[test]
	fn test_recursive_direct_cycle() {
		let d = doc("a = \"(TOKENMARK(a))\"\n");
		let result = render(&d, Expansion::Recursive { max_depth: 8 }, "(TOKENMARK(a))");

		match result.unwrap_err() {
			SitebakeError::CyclicSubstitution { chain, offset, .. } => {
				assert_eq!(chain, "a -> a");
				assert_eq!(offset, 0);
			}
			e => panic!("Expected CyclicSubstitution, got {e:?}"),
		}
	}

	#[test]
	fn test_recursive_transitive_cycle() {
		let d = doc("a = \"(TOKENMARK(b))\"\nb = \"x(TOKENMARK(c))\"\nc = \"(TOKENMARK(a))\"\n");
		let result = render(&d, Expansion::Recursive { max_depth: 8 }, "(TOKENMARK(a))");

		match result.unwrap_err() {
			SitebakeError::CyclicSubstitution { chain, .. } => {
				assert_eq!(chain, "a -> b -> c -> a");
			}
			e => panic!("Expected CyclicSubstitution, got {e:?}"),
		}
	}

	#[test]
	fn test_recursive_depth_limit() {
		let d = doc("a = \"(TOKENMARK(b))\"\nb = \"(TOKENMARK(c))\"\nc = \"end\"\n");

		let ok = render(&d, Expansion::Recursive { max_depth: 3 }, "(TOKENMARK(a))").unwrap();
		assert_eq!(ok.content, "end");

		let result = render(&d, Expansion::Recursive { max_depth: 2 }, "(TOKENMARK(a))");
		assert!(matches!(
			result,
			Err(SitebakeError::CyclicSubstitution { .. })
		));
	}

	#[test]
	fn test_recursive_same_key_twice_is_not_a_cycle() {
		let d = doc("d = \"x\"\npair = \"(TOKENMARK(d))-(TOKENMARK(d))\"\n");
		let rendered =
			render(&d, Expansion::Recursive { max_depth: 4 }, "(TOKENMARK(pair))").unwrap();

		assert_eq!(rendered.content, "x-x");
	}

	#[test]
	fn test_substitute_file_rewrites_only_when_needed() {
		let temp_dir = tempfile::tempdir().unwrap();
		let with = temp_dir.path().join("with.html");
		let without = temp_dir.path().join("without.html");
		fs::write(&with, "<title>(TOKENMARK(title))</title>").unwrap();
		fs::write(&without, "<p>static</p>").unwrap();

		let d = doc("title = \"Taktlaus\"\n");
		let syntax = PlaceholderSyntax::default();
		let substitutor = Substitutor::new(&d, &syntax, Expansion::Reject);

		assert_eq!(substitutor.substitute_file(&with).unwrap(), 1);
		assert_eq!(substitutor.substitute_file(&without).unwrap(), 0);
		assert_eq!(fs::read_to_string(&with).unwrap(), "<title>Taktlaus</title>");
		assert_eq!(fs::read_to_string(&without).unwrap(), "<p>static</p>");
	}

	#[test]
	fn test_substitute_tree_skips_ineligible_files() {
		let temp_dir = tempfile::tempdir().unwrap();
		let root = temp_dir.path();
		fs::create_dir_all(root.join("site")).unwrap();
		fs::write(root.join("site").join("app.js"), "const c = '(TOKENMARK(c))';").unwrap();
		fs::write(root.join("site").join("notes.bin"), "(TOKENMARK(c))").unwrap();
		fs::write(root.join(".env"), "C=(TOKENMARK(c))").unwrap();

		let d = doc("c = \"blue\"\n");
		let syntax = PlaceholderSyntax::default();
		let report = Substitutor::new(&d, &syntax, Expansion::Reject)
			.substitute_tree(root, &Extensions::default())
			.unwrap();

		assert_eq!(
			report,
			SubstitutionReport {
				files_scanned: 2,
				files_rewritten: 2,
				substitutions: 2,
			}
		);
		assert_eq!(
			fs::read_to_string(root.join("site").join("app.js")).unwrap(),
			"const c = 'blue';"
		);
		assert_eq!(fs::read_to_string(root.join(".env")).unwrap(), "C=blue");
		assert_eq!(
			fs::read_to_string(root.join("site").join("notes.bin")).unwrap(),
			"(TOKENMARK(c))"
		);
	}

	#[test]
	fn test_substitute_tree_fails_fast() {
		let temp_dir = tempfile::tempdir().unwrap();
		let root = temp_dir.path();
		fs::write(root.join("a.html"), "(TOKENMARK(ok))").unwrap();
		fs::write(root.join("b.html"), "(TOKENMARK(missing))").unwrap();
		fs::write(root.join("c.html"), "(TOKENMARK(ok))").unwrap();

		let d = doc("ok = \"yes\"\n");
		let syntax = PlaceholderSyntax::default();
		let result = Substitutor::new(&d, &syntax, Expansion::Reject)
			.substitute_tree(root, &Extensions::default());

		match result.unwrap_err() {
			SitebakeError::UnresolvedPlaceholder { file, key, .. } => {
				assert_eq!(file, root.join("b.html"));
				assert_eq!(key, "missing");
			}
			e => panic!("Expected UnresolvedPlaceholder, got {e:?}"),
		}
		// Earlier file rewritten, later file untouched
		assert_eq!(fs::read_to_string(root.join("a.html")).unwrap(), "yes");
		assert_eq!(fs::read_to_string(root.join("c.html")).unwrap(), "(TOKENMARK(ok))");
	}
}
