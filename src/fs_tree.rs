//! Disk-backed target tree rooted at a base directory. Every resolved path is
//! checked to stay under the base before it is touched.

use crate::{Error, NodeKind, Result, TargetTree};
use simple_fs::{SPath, read_to_string};
use std::collections::BTreeMap;
use std::fs;

/// Properties are held in memory for the lifetime of the tree value:
/// persistent property storage is working-copy metadata and stays with the
/// caller.
#[derive(Debug)]
pub struct FsTree {
	base_dir: SPath,
	props: BTreeMap<String, BTreeMap<String, String>>,
}

impl FsTree {
	pub fn new(base_dir: impl Into<SPath>) -> Result<Self> {
		let base_dir = base_dir.into().into_collapsed();
		fs::create_dir_all(base_dir.std_path()).map_err(|err| Error::tree_io(base_dir.as_str(), err))?;
		Ok(Self {
			base_dir,
			props: BTreeMap::new(),
		})
	}

	pub fn base_dir(&self) -> &SPath {
		&self.base_dir
	}

	/// Resolves a tree path under the base dir, refusing anything that
	/// collapses to the outside. The prefix check is separator-aware so that
	/// a sibling like `base-extra` does not pass as inside `base`.
	fn full_path(&self, path: &str) -> Result<SPath> {
		let full = self.base_dir.join(path).into_collapsed();
		let base = self.base_dir.as_str();
		if full.as_str() != base && !full.as_str().starts_with(&format!("{base}/")) {
			return Err(Error::outside_base(path, base));
		}
		Ok(full)
	}
}

impl TargetTree for FsTree {
	fn read(&self, path: &str) -> Result<Option<String>> {
		let full = self.full_path(path)?;
		if !full.exists() {
			return Ok(None);
		}
		let content = read_to_string(&full).map_err(Error::simple_fs)?;
		Ok(Some(content))
	}

	fn write(&mut self, path: &str, content: &str) -> Result<()> {
		let full = self.full_path(path)?;
		fs::write(full.std_path(), content).map_err(|err| Error::tree_io(path, err))
	}

	fn kind(&self, path: &str) -> Result<Option<NodeKind>> {
		let full = self.full_path(path)?;
		if !full.exists() {
			Ok(None)
		} else if full.is_dir() {
			Ok(Some(NodeKind::Dir))
		} else {
			Ok(Some(NodeKind::File))
		}
	}

	fn list_children(&self, path: &str) -> Result<Vec<String>> {
		let full = self.full_path(path)?;
		let entries = fs::read_dir(full.std_path()).map_err(|err| Error::tree_io(path, err))?;

		let mut children = Vec::new();
		for entry in entries {
			let entry = entry.map_err(|err| Error::tree_io(path, err))?;
			let name = entry.file_name().to_string_lossy().to_string();
			if path.is_empty() {
				children.push(name);
			} else {
				children.push(format!("{path}/{name}"));
			}
		}
		children.sort();
		Ok(children)
	}

	fn delete(&mut self, path: &str) -> Result<()> {
		let full = self.full_path(path)?;
		let res = if full.is_dir() {
			fs::remove_dir(full.std_path())
		} else {
			fs::remove_file(full.std_path())
		};
		res.map_err(|err| Error::tree_io(path, err))?;
		self.props.remove(path);
		Ok(())
	}

	fn mkdir(&mut self, path: &str) -> Result<()> {
		let full = self.full_path(path)?;
		fs::create_dir(full.std_path()).map_err(|err| Error::tree_io(path, err))
	}

	fn prop_get(&self, path: &str, name: &str) -> Result<Option<String>> {
		self.full_path(path)?;
		Ok(self.props.get(path).and_then(|m| m.get(name)).cloned())
	}

	fn prop_set(&mut self, path: &str, name: &str, value: Option<&str>) -> Result<()> {
		self.full_path(path)?;
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
		self.full_path(path)?;
		Ok(self
			.props
			.get(path)
			.map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
			.unwrap_or_default())
	}
}
