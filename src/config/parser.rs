use crate::config::document::ConfigDocument;
use crate::config::types::ProjectConfig;
use crate::error::{Result, SitebakeError};
use std::path::Path;

/// Parse a layer file from the given path.
pub fn parse_layer_file(path: &Path) -> Result<ConfigDocument> {
	let content = std::fs::read_to_string(path).map_err(|source| SitebakeError::LayerReadError {
		path: path.to_path_buf(),
		source,
	})?;

	parse_layer_str(&content, path)
}

/// Parse a layer from a string (useful for testing).
pub fn parse_layer_str(content: &str, path: &Path) -> Result<ConfigDocument> {
	let table: toml::Table =
		toml::from_str(content).map_err(|source| SitebakeError::LayerParseError {
			path: path.to_path_buf(),
			source,
		})?;

	ConfigDocument::from_toml(table, path)
}

/// Parse a `.sitebake.toml` project file from the given path.
pub fn parse_project_file(path: &Path) -> Result<ProjectConfig> {
	let content = std::fs::read_to_string(path).map_err(|source| SitebakeError::ProjectReadError {
		path: path.to_path_buf(),
		source,
	})?;

	parse_project_str(&content, path)
}

/// Parse a project config from a string (useful for testing).
pub fn parse_project_str(content: &str, path: &Path) -> Result<ProjectConfig> {
	let config: ProjectConfig =
		toml::from_str(content).map_err(|source| SitebakeError::ProjectParseError {
			path: path.to_path_buf(),
			source,
		})?;

	// Validate the parsed config
	config.validate()?;

	Ok(config)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::types::{ExpansionMode, LayerEntry};
	use std::path::PathBuf;

	#[test]
	fn test_parse_empty_layer() {
		let path = PathBuf::from("config.toml");
		let doc = parse_layer_str("", &path).unwrap();

		assert!(doc.is_empty());
	}

	#[test]
	fn test_parse_layer_with_dotted_keys() {
		let content = r#"
appearance.navbar.title = "Taktlaus"

[production.server.environment]
allowed_hosts = "example.org www.example.org"
"#;
		let path = PathBuf::from("config.toml");
		let doc = parse_layer_str(content, &path).unwrap();

		assert_eq!(
			doc.get_scalar("appearance.navbar.title").unwrap().to_string(),
			"Taktlaus"
		);
		assert_eq!(
			doc.get_scalar("production.server.environment.allowed_hosts")
				.unwrap()
				.to_string(),
			"example.org www.example.org"
		);
	}

	#[test]
	fn test_parse_invalid_layer() {
		let path = PathBuf::from("broken.toml");
		let result = parse_layer_str("invalid toml [[[", &path);

		match result.unwrap_err() {
			SitebakeError::LayerParseError { path, .. } => {
				assert_eq!(path, PathBuf::from("broken.toml"));
			}
			e => panic!("Expected LayerParseError, got {e:?}"),
		}
	}

	#[test]
	fn test_parse_missing_layer_file() {
		let temp_dir = tempfile::tempdir().unwrap();
		let result = parse_layer_file(&temp_dir.path().join("absent.toml"));

		assert!(matches!(
			result,
			Err(SitebakeError::LayerReadError { .. })
		));
	}

	#[test]
	fn test_parse_empty_project() {
		let path = PathBuf::from(".sitebake.toml");
		let config = parse_project_str("", &path).unwrap();

		assert_eq!(config.source_dir, PathBuf::from("website_source"));
		assert_eq!(config.static_dir, PathBuf::from("static_files"));
		assert_eq!(config.build_dir, PathBuf::from("website_build"));
		assert_eq!(config.static_subpath, PathBuf::from("site/static"));
		assert_eq!(config.marker, "TOKENMARK");
		assert_eq!(config.expansion, ExpansionMode::Reject);
		assert_eq!(config.layers, vec![LayerEntry::Path(PathBuf::from("config.toml"))]);
	}

	#[test]
	fn test_parse_full_project() {
		let content = r#"
source-dir = "src"
static-dir = "assets"
build-dir = "out"
static-subpath = "public"
marker = "SITE_VAR"
extensions = ["tpl", ".j2"]
expansion = "recursive"
max-depth = 4
set-policy = "coerce"
layers = [
    "base.toml",
    { path = "secrets.toml", required = false },
]
"#;
		let path = PathBuf::from(".sitebake.toml");
		let config = parse_project_str(content, &path).unwrap();

		assert_eq!(config.source_dir, PathBuf::from("src"));
		assert_eq!(config.marker, "SITE_VAR");
		assert_eq!(config.extensions, vec!["tpl", ".j2"]);
		assert_eq!(config.expansion, ExpansionMode::Recursive);
		assert_eq!(config.max_depth, 4);
		assert_eq!(config.layers.len(), 2);
		assert_eq!(
			config.layers[1],
			LayerEntry::Detailed {
				path: PathBuf::from("secrets.toml"),
				required: false,
			}
		);
	}

	#[test]
	fn test_parse_project_rejects_unknown_keys() {
		let path = PathBuf::from(".sitebake.toml");
		let result = parse_project_str("sorce-dir = \"typo\"\n", &path);

		assert!(matches!(
			result,
			Err(SitebakeError::ProjectParseError { .. })
		));
	}

	#[test]
	fn test_parse_project_validates_marker() {
		let path = PathBuf::from(".sitebake.toml");
		let result = parse_project_str("marker = \"BAD(MARK\"\n", &path);

		assert!(matches!(
			result,
			Err(SitebakeError::InvalidMarker { .. })
		));
	}
}
