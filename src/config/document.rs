use crate::error::{Result, SitebakeError};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Ordered mapping of keys to nodes.
pub type Table = BTreeMap<String, Node>;

/// A leaf value in a [`ConfigDocument`].
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
	String(String),
	Integer(i64),
	Float(f64),
	Boolean(bool),
}

impl fmt::Display for Scalar {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Scalar::String(value) => f.write_str(value),
			Scalar::Integer(value) => write!(f, "{value}"),
			Scalar::Float(value) => write!(f, "{value}"),
			Scalar::Boolean(value) => write!(f, "{value}"),
		}
	}
}

/// A node in a [`ConfigDocument`]: either a nested table or a scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
	Table(Table),
	Scalar(Scalar),
}

impl Node {
	pub fn as_table(&self) -> Option<&Table> {
		match self {
			Node::Table(table) => Some(table),
			Node::Scalar(_) => None,
		}
	}

	pub fn as_scalar(&self) -> Option<&Scalar> {
		match self {
			Node::Scalar(scalar) => Some(scalar),
			Node::Table(_) => None,
		}
	}
}

impl From<Scalar> for Node {
	fn from(scalar: Scalar) -> Self {
		Node::Scalar(scalar)
	}
}

impl From<&str> for Node {
	fn from(value: &str) -> Self {
		Node::Scalar(Scalar::String(value.to_string()))
	}
}

impl From<String> for Node {
	fn from(value: String) -> Self {
		Node::Scalar(Scalar::String(value))
	}
}

impl From<i64> for Node {
	fn from(value: i64) -> Self {
		Node::Scalar(Scalar::Integer(value))
	}
}

impl From<bool> for Node {
	fn from(value: bool) -> Self {
		Node::Scalar(Scalar::Boolean(value))
	}
}

impl From<Table> for Node {
	fn from(table: Table) -> Self {
		Node::Table(table)
	}
}

/// What `set` does when an intermediate segment holds a scalar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SetPolicy {
	/// Refuse with [`SitebakeError::TableScalarConflict`].
	#[default]
	Strict,
	/// Replace the scalar with an empty table, discarding it.
	Coerce,
}

/// Hierarchical key/value document addressed by dotted paths (`a.b.c`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
	root: Table,
}

impl ConfigDocument {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn root(&self) -> &Table {
		&self.root
	}

	pub fn is_empty(&self) -> bool {
		self.root.is_empty()
	}

	/// Resolve a dotted path to the node stored there.
	pub fn get(&self, key: &str) -> Result<&Node> {
		let segments = split_key(key)?;
		let mut table = &self.root;
		let last = segments.len() - 1;

		for (i, segment) in segments.iter().enumerate() {
			let node = table
				.get(*segment)
				.ok_or_else(|| SitebakeError::KeyNotFound {
					key: key.to_string(),
					missing: segment.to_string(),
				})?;

			if i == last {
				return Ok(node);
			}

			table = match node {
				Node::Table(next) => next,
				// A scalar can't have children, so the next segment is the missing one.
				Node::Scalar(_) => {
					return Err(SitebakeError::KeyNotFound {
						key: key.to_string(),
						missing: segments[i + 1].to_string(),
					});
				}
			};
		}

		unreachable!("split_key never returns an empty list")
	}

	/// Resolve a dotted path that must land on a scalar.
	pub fn get_scalar(&self, key: &str) -> Result<&Scalar> {
		match self.get(key)? {
			Node::Scalar(scalar) => Ok(scalar),
			Node::Table(_) => Err(SitebakeError::NotAScalar {
				key: key.to_string(),
			}),
		}
	}

	/// Store `value` at a dotted path, creating intermediate tables.
	///
	/// Returns the node previously stored at that path.
	pub fn set(
		&mut self,
		key: &str,
		value: impl Into<Node>,
		policy: SetPolicy,
	) -> Result<Option<Node>> {
		let segments = split_key(key)?;
		let (leaf, parents) = segments
			.split_last()
			.ok_or_else(|| SitebakeError::InvalidKey {
				key: key.to_string(),
			})?;

		// Check the whole path first so a strict failure leaves the document untouched.
		if policy == SetPolicy::Strict {
			let mut table = &self.root;
			for segment in parents {
				match table.get(*segment) {
					Some(Node::Table(next)) => table = next,
					Some(Node::Scalar(_)) => {
						return Err(SitebakeError::TableScalarConflict {
							key: key.to_string(),
							segment: segment.to_string(),
						});
					}
					None => break,
				}
			}
		}

		let mut table = &mut self.root;
		for segment in parents {
			let slot = table
				.entry(segment.to_string())
				.or_insert_with(|| Node::Table(Table::new()));
			if let Node::Scalar(_) = slot {
				*slot = Node::Table(Table::new());
			}
			table = match slot {
				Node::Table(next) => next,
				Node::Scalar(_) => unreachable!("scalar replaced above"),
			};
		}

		Ok(table.insert(leaf.to_string(), value.into()))
	}

	/// Deep-merge `other` into `self`; `other` wins every conflict.
	///
	/// Two tables at the same key are merged recursively. Any other
	/// combination replaces the existing node wholesale.
	pub fn merge_from(&mut self, other: ConfigDocument) {
		merge_tables(&mut self.root, other.root);
	}

	/// Dotted paths of every scalar in the document, in key order.
	pub fn leaf_keys(&self) -> Vec<String> {
		let mut keys = Vec::new();
		collect_leaf_keys(&self.root, "", &mut keys);
		keys
	}

	/// Convert a parsed TOML table. `origin` is only used for error reporting.
	pub fn from_toml(table: toml::Table, origin: &Path) -> Result<Self> {
		Ok(Self {
			root: table_from_toml(table, "", origin)?,
		})
	}

	/// Convert back to a TOML table for display or write-back.
	pub fn to_toml(&self) -> toml::Table {
		table_to_toml(&self.root)
	}
}

impl From<Table> for ConfigDocument {
	fn from(root: Table) -> Self {
		Self { root }
	}
}

fn split_key(key: &str) -> Result<Vec<&str>> {
	let segments: Vec<&str> = key.split('.').collect();
	if segments.iter().any(|segment| segment.is_empty()) {
		return Err(SitebakeError::InvalidKey {
			key: key.to_string(),
		});
	}
	Ok(segments)
}

fn merge_tables(base: &mut Table, overlay: Table) {
	for (key, node) in overlay {
		match (base.get_mut(&key), node) {
			(Some(Node::Table(existing)), Node::Table(incoming)) => {
				merge_tables(existing, incoming);
			}
			(_, node) => {
				base.insert(key, node);
			}
		}
	}
}

fn collect_leaf_keys(table: &Table, prefix: &str, keys: &mut Vec<String>) {
	for (key, node) in table {
		let path = join_key(prefix, key);
		match node {
			Node::Table(child) => collect_leaf_keys(child, &path, keys),
			Node::Scalar(_) => keys.push(path),
		}
	}
}

fn join_key(prefix: &str, key: &str) -> String {
	if prefix.is_empty() {
		key.to_string()
	} else {
		format!("{prefix}.{key}")
	}
}

fn table_from_toml(table: toml::Table, prefix: &str, origin: &Path) -> Result<Table> {
	let mut out = Table::new();
	for (key, value) in table {
		let path = join_key(prefix, &key);
		let node = match value {
			toml::Value::String(s) => Node::Scalar(Scalar::String(s)),
			toml::Value::Integer(i) => Node::Scalar(Scalar::Integer(i)),
			toml::Value::Float(f) => Node::Scalar(Scalar::Float(f)),
			toml::Value::Boolean(b) => Node::Scalar(Scalar::Boolean(b)),
			toml::Value::Datetime(dt) => Node::Scalar(Scalar::String(dt.to_string())),
			toml::Value::Table(child) => Node::Table(table_from_toml(child, &path, origin)?),
			toml::Value::Array(_) => {
				return Err(SitebakeError::UnsupportedValue {
					path: origin.to_path_buf(),
					key: path,
					kind: "array",
				});
			}
		};
		out.insert(key, node);
	}
	Ok(out)
}

fn table_to_toml(table: &Table) -> toml::Table {
	let mut out = toml::Table::new();
	for (key, node) in table {
		let value = match node {
			Node::Table(child) => toml::Value::Table(table_to_toml(child)),
			Node::Scalar(Scalar::String(s)) => toml::Value::String(s.clone()),
			Node::Scalar(Scalar::Integer(i)) => toml::Value::Integer(*i),
			Node::Scalar(Scalar::Float(f)) => toml::Value::Float(*f),
			Node::Scalar(Scalar::Boolean(b)) => toml::Value::Boolean(*b),
		};
		out.insert(key.clone(), value);
	}
	out
}
