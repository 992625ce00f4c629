use crate::error::{Result, SitebakeError};
use regex::Regex;
use std::ops::Range;

/// The placeholder wrapper syntax: `(MARKER(dotted.key))`.
#[derive(Debug, Clone)]
pub struct PlaceholderSyntax {
	marker: String,
	pattern: Regex,
}

/// A placeholder found in some text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'t> {
	/// The dotted key inside the wrapper.
	pub key: &'t str,

	/// Byte range of the whole token, wrapper included.
	pub span: Range<usize>,
}

impl PlaceholderSyntax {
	/// Build the syntax for `marker`.
	///
	/// The marker must be non-empty and free of parentheses and whitespace,
	/// otherwise tokens could not be delimited.
	pub fn new(marker: &str) -> Result<Self> {
		if marker.is_empty() {
			return Err(SitebakeError::InvalidMarker {
				marker: marker.to_string(),
				source: regex::Error::Syntax("Marker must not be empty".to_string()),
			});
		}

		if marker
			.chars()
			.any(|c| c == '(' || c == ')' || c.is_whitespace())
		{
			return Err(SitebakeError::InvalidMarker {
				marker: marker.to_string(),
				source: regex::Error::Syntax(
					"Marker must not contain parentheses or whitespace".to_string(),
				),
			});
		}

		let pattern_str = format!(r"\({}\((.+?)\)\)", regex::escape(marker));
		let pattern = Regex::new(&pattern_str).map_err(|source| SitebakeError::InvalidMarker {
			marker: marker.to_string(),
			source,
		})?;

		Ok(Self {
			marker: marker.to_string(),
			pattern,
		})
	}

	pub fn marker(&self) -> &str {
		&self.marker
	}

	/// Render the token for `key`.
	pub fn token(&self, key: &str) -> String {
		format!("({}({}))", self.marker, key)
	}

	/// All non-overlapping placeholders in `text`, left to right.
	pub fn find_all<'t>(&self, text: &'t str) -> impl Iterator<Item = Placeholder<'t>> {
		self.pattern.captures_iter(text).filter_map(|caps| {
			let whole = caps.get(0)?;
			let key = caps.get(1)?;
			Some(Placeholder {
				key: key.as_str(),
				span: whole.range(),
			})
		})
	}

	pub fn contains(&self, text: &str) -> bool {
		self.pattern.is_match(text)
	}
}

impl Default for PlaceholderSyntax {
	fn default() -> Self {
		// The default marker is a plain identifier, so this can't fail.
		Self::new("TOKENMARK").unwrap_or_else(|e| unreachable!("default marker is valid: {e}"))
	}
}
