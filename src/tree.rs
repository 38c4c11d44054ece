//! Target tree abstraction the applier mutates: a content/property store
//! keyed by slash-separated relative path, plus an in-memory implementation.

use crate::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
	File,
	Dir,
}

impl NodeKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			NodeKind::File => "file",
			NodeKind::Dir => "directory",
		}
	}
}

/// The applier's narrow contract with the world it mutates.
///
/// Paths are relative, slash-separated; `""` names the root directory, which
/// always exists. The applier is the only writer during an apply call, so
/// implementations need no interior synchronization.
pub trait TargetTree {
	/// File content, or None when no file exists at `path`.
	fn read(&self, path: &str) -> Result<Option<String>>;

	/// Creates or overwrites the file. The parent directory must exist.
	fn write(&mut self, path: &str, content: &str) -> Result<()>;

	fn kind(&self, path: &str) -> Result<Option<NodeKind>>;

	/// Child paths of a directory (full relative paths), in stable order.
	fn list_children(&self, path: &str) -> Result<Vec<String>>;

	/// Removes a file, or an empty directory.
	fn delete(&mut self, path: &str) -> Result<()>;

	/// Creates a single directory; parents are not created implicitly.
	fn mkdir(&mut self, path: &str) -> Result<()>;

	fn prop_get(&self, path: &str, name: &str) -> Result<Option<String>>;

	/// Sets a property value, or removes the property when `value` is None.
	fn prop_set(&mut self, path: &str, name: &str, value: Option<&str>) -> Result<()>;

	/// All properties of a path, in stable order.
	fn prop_list(&self, path: &str) -> Result<Vec<(String, String)>>;
}

// region:    --- Path Helpers

pub(crate) fn parent_path(path: &str) -> &str {
	path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

/// Ancestor directories of `path`, root-most first (excludes the root itself).
pub(crate) fn ancestor_paths(path: &str) -> Vec<String> {
	let mut out = Vec::new();
	for (idx, ch) in path.char_indices() {
		if ch == '/' {
			out.push(path[..idx].to_string());
		}
	}
	out
}

// endregion: --- Path Helpers

// region:    --- MemTree

/// In-memory target tree with deterministic child ordering. Useful for tests
/// and for previewing a patch without touching disk.
#[derive(Debug, Clone, Default)]
pub struct MemTree {
	files: BTreeMap<String, String>,
	dirs: BTreeSet<String>,
	props: BTreeMap<String, BTreeMap<String, String>>,
}

impl MemTree {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a tree from (path, content) pairs, creating parent directories.
	pub fn from_files(files: &[(&str, &str)]) -> Self {
		let mut tree = Self::default();
		for (path, content) in files {
			tree.insert_file(path, content);
		}
		tree
	}

	/// Inserts a file and all of its parent directories.
	pub fn insert_file(&mut self, path: &str, content: &str) {
		for ancestor in ancestor_paths(path) {
			self.dirs.insert(ancestor);
		}
		self.files.insert(path.to_string(), content.to_string());
	}

	pub fn insert_prop(&mut self, path: &str, name: &str, value: &str) {
		self.props
			.entry(path.to_string())
			.or_default()
			.insert(name.to_string(), value.to_string());
	}

	pub fn content_of(&self, path: &str) -> Option<&str> {
		self.files.get(path).map(String::as_str)
	}

	pub fn prop_of(&self, path: &str, name: &str) -> Option<&str> {
		self.props.get(path).and_then(|m| m.get(name)).map(String::as_str)
	}

	pub fn file_paths(&self) -> impl Iterator<Item = &str> {
		self.files.keys().map(String::as_str)
	}

	pub fn has_dir(&self, path: &str) -> bool {
		path.is_empty() || self.dirs.contains(path)
	}
}

impl TargetTree for MemTree {
	fn read(&self, path: &str) -> Result<Option<String>> {
		Ok(self.files.get(path).cloned())
	}

	fn write(&mut self, path: &str, content: &str) -> Result<()> {
		if self.dirs.contains(path) {
			return Err(Error::tree_io(path, "is a directory"));
		}
		self.files.insert(path.to_string(), content.to_string());
		Ok(())
	}

	fn kind(&self, path: &str) -> Result<Option<NodeKind>> {
		if path.is_empty() || self.dirs.contains(path) {
			Ok(Some(NodeKind::Dir))
		} else if self.files.contains_key(path) {
			Ok(Some(NodeKind::File))
		} else {
			Ok(None)
		}
	}

	fn list_children(&self, path: &str) -> Result<Vec<String>> {
		let mut children: Vec<String> = self
			.files
			.keys()
			.chain(self.dirs.iter())
			.filter(|p| parent_path(p) == path && !p.is_empty())
			.cloned()
			.collect();
		children.sort();
		children.dedup();
		Ok(children)
	}

	fn delete(&mut self, path: &str) -> Result<()> {
		if self.files.remove(path).is_some() {
			self.props.remove(path);
			return Ok(());
		}
		if self.dirs.contains(path) {
			if !self.list_children(path)?.is_empty() {
				return Err(Error::tree_io(path, "directory not empty"));
			}
			self.dirs.remove(path);
			self.props.remove(path);
			return Ok(());
		}
		Err(Error::tree_io(path, "no such entry"))
	}

	fn mkdir(&mut self, path: &str) -> Result<()> {
		if self.files.contains_key(path) {
			return Err(Error::tree_io(path, "a file is in the way"));
		}
		self.dirs.insert(path.to_string());
		Ok(())
	}

	fn prop_get(&self, path: &str, name: &str) -> Result<Option<String>> {
		Ok(self.props.get(path).and_then(|m| m.get(name)).cloned())
	}

	fn prop_set(&mut self, path: &str, name: &str, value: Option<&str>) -> Result<()> {
		match value {
			Some(value) => {
				self.props
					.entry(path.to_string())
					.or_default()
					.insert(name.to_string(), value.to_string());
			}
			None => {
				if let Some(map) = self.props.get_mut(path) {
					map.remove(name);
					if map.is_empty() {
						self.props.remove(path);
					}
				}
			}
		}
		Ok(())
	}

	fn prop_list(&self, path: &str) -> Result<Vec<(String, String)>> {
		Ok(self
			.props
			.get(path)
			.map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
			.unwrap_or_default())
	}
}

// endregion: --- MemTree
