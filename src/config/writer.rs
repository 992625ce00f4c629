use crate::config::document::{ConfigDocument, Node, Scalar, SetPolicy};
use crate::config::parser::parse_layer_file;
use crate::error::{Result, SitebakeError};
use std::path::Path;
use tracing::info;

/// A single `key = value` assignment for [`set_layer_values`].
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
	pub key: String,
	pub value: Node,
}

impl Assignment {
	/// Parse `key=value`. With `typed`, `true`/`false` and base-10 integers
	/// become booleans and integers; everything else stays a string.
	pub fn parse(input: &str, typed: bool) -> Result<Self> {
		let (key, raw) = input
			.split_once('=')
			.ok_or_else(|| SitebakeError::InvalidKey {
				key: input.to_string(),
			})?;
		let key = key.trim();
		if key.is_empty() {
			return Err(SitebakeError::InvalidKey {
				key: input.to_string(),
			});
		}

		let value = if typed {
			parse_typed(raw)
		} else {
			Scalar::String(raw.to_string())
		};

		Ok(Assignment {
			key: key.to_string(),
			value: Node::Scalar(value),
		})
	}
}

fn parse_typed(raw: &str) -> Scalar {
	match raw {
		"true" => Scalar::Boolean(true),
		"false" => Scalar::Boolean(false),
		_ => raw
			.parse::<i64>()
			.map(Scalar::Integer)
			.unwrap_or_else(|_| Scalar::String(raw.to_string())),
	}
}

/// Apply assignments to the layer at `path` and write it back.
///
/// The existing file, if any, is loaded first so the new values are merged
/// over its content. Returns the resulting document.
pub fn set_layer_values(
	path: &Path,
	assignments: &[Assignment],
	policy: SetPolicy,
) -> Result<ConfigDocument> {
	let mut document = if path.exists() {
		parse_layer_file(path)?
	} else {
		ConfigDocument::new()
	};

	for assignment in assignments {
		document.set(&assignment.key, assignment.value.clone(), policy)?;
	}

	write_layer_file(path, &document)?;
	info!(path = %path.display(), count = assignments.len(), "updated layer");

	Ok(document)
}

/// Serialize a document to TOML text.
pub fn render_layer(document: &ConfigDocument, path: &Path) -> Result<String> {
	let table = toml::Value::Table(document.to_toml());
	toml::to_string(&table).map_err(|source| SitebakeError::LayerWriteError {
		path: path.to_path_buf(),
		source,
	})
}

/// Write a document to `path`, creating parent directories.
pub fn write_layer_file(path: &Path, document: &ConfigDocument) -> Result<()> {
	let content = render_layer(document, path)?;

	if let Some(parent) = path.parent()
		&& !parent.as_os_str().is_empty()
	{
		std::fs::create_dir_all(parent)
			.map_err(|source| SitebakeError::io("create directory", parent, source))?;
	}

	std::fs::write(path, content).map_err(|source| SitebakeError::io("write layer", path, source))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;

	#[test]
	fn test_parse_assignment_as_string() {
		let a = Assignment::parse("appearance.primary_color=#ff0000", false).unwrap();
		assert_eq!(a.key, "appearance.primary_color");
		assert_eq!(a.value, Node::from("#ff0000"));

		// Only the first '=' splits
		let a = Assignment::parse("env.extra=a=b", false).unwrap();
		assert_eq!(a.value, Node::from("a=b"));

		// Numbers stay strings unless typed
		let a = Assignment::parse("port=8000", false).unwrap();
		assert_eq!(a.value, Node::from("8000"));
	}

	#[test]
	fn test_parse_assignment_typed() {
		assert_eq!(
			Assignment::parse("port=8000", true).unwrap().value,
			Node::from(8000_i64)
		);
		assert_eq!(
			Assignment::parse("debug=true", true).unwrap().value,
			Node::from(true)
		);
		assert_eq!(
			Assignment::parse("name=taktlaus", true).unwrap().value,
			Node::from("taktlaus")
		);
	}

	#[test]
	fn test_parse_assignment_invalid() {
		assert!(Assignment::parse("no-equals", false).is_err());
		assert!(Assignment::parse("=value", false).is_err());
	}

	#[test]
	fn test_set_layer_values_creates_file() {
		let temp_dir = tempfile::tempdir().unwrap();
		let path = temp_dir.path().join("nested").join("config.toml");

		let assignments = [
			Assignment::parse("initial_data.site.domain=example.org", false).unwrap(),
			Assignment::parse("appearance.navbar.title=Orchestra", false).unwrap(),
		];
		set_layer_values(&path, &assignments, SetPolicy::Strict).unwrap();

		let reloaded = parse_layer_file(&path).unwrap();
		assert_eq!(
			reloaded.get_scalar("initial_data.site.domain").unwrap().to_string(),
			"example.org"
		);
		assert_eq!(
			reloaded.get_scalar("appearance.navbar.title").unwrap().to_string(),
			"Orchestra"
		);
	}

	#[test]
	fn test_set_layer_values_merges_over_existing() {
		let temp_dir = tempfile::tempdir().unwrap();
		let path = temp_dir.path().join("config.toml");
		fs::write(&path, "[appearance]\nprimary_color = \"red\"\nfavicon = \"logo.ico\"\n").unwrap();

		let assignments = [Assignment::parse("appearance.primary_color=blue", false).unwrap()];
		let document = set_layer_values(&path, &assignments, SetPolicy::Strict).unwrap();

		assert_eq!(
			document.get_scalar("appearance.primary_color").unwrap().to_string(),
			"blue"
		);
		assert_eq!(
			document.get_scalar("appearance.favicon").unwrap().to_string(),
			"logo.ico"
		);
		assert_eq!(parse_layer_file(&path).unwrap(), document);
	}

	#[test]
	fn test_set_layer_values_strict_conflict_leaves_file() {
		let temp_dir = tempfile::tempdir().unwrap();
		let path = temp_dir.path().join("config.toml");
		let original = "appearance = \"flat\"\n";
		fs::write(&path, original).unwrap();

		let assignments = [Assignment::parse("appearance.primary_color=blue", false).unwrap()];
		let result = set_layer_values(&path, &assignments, SetPolicy::Strict);

		assert!(matches!(
			result,
			Err(SitebakeError::TableScalarConflict { .. })
		));
		assert_eq!(fs::read_to_string(&path).unwrap(), original);
	}
}
