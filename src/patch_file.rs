//! Per-file change description: the operation, content hunks, and property
//! changes addressed at one target path.

use crate::Hunk;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchOperation {
	#[default]
	Modify,
	Add,
	Delete,
	Copy,
	Move,
}

impl PatchOperation {
	pub fn as_str(&self) -> &'static str {
		match self {
			PatchOperation::Modify => "modify",
			PatchOperation::Add => "add",
			PatchOperation::Delete => "delete",
			PatchOperation::Copy => "copy",
			PatchOperation::Move => "move",
		}
	}
}

// region:    --- PropChange

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropKind {
	Added,
	Deleted,
	Modified,
}

/// Whole-value property change. Values are single lines; a value that does
/// not end with `\n` is the "missing trailing newline" case and renders with
/// the explicit marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropChange {
	pub name: String,
	pub kind: PropKind,
	/// Absent iff the property is being added.
	pub old_value: Option<String>,
	/// Absent iff the property is being deleted.
	pub new_value: Option<String>,
}

impl PropChange {
	pub fn added(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			kind: PropKind::Added,
			old_value: None,
			new_value: Some(value.into()),
		}
	}

	pub fn deleted(name: impl Into<String>, old_value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			kind: PropKind::Deleted,
			old_value: Some(old_value.into()),
			new_value: None,
		}
	}

	pub fn modified(name: impl Into<String>, old_value: impl Into<String>, new_value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			kind: PropKind::Modified,
			old_value: Some(old_value.into()),
			new_value: Some(new_value.into()),
		}
	}

	/// The same change with old and new sides swapped.
	pub fn reversed(&self) -> PropChange {
		let kind = match self.kind {
			PropKind::Added => PropKind::Deleted,
			PropKind::Deleted => PropKind::Added,
			PropKind::Modified => PropKind::Modified,
		};
		PropChange {
			name: self.name.clone(),
			kind,
			old_value: self.new_value.clone(),
			new_value: self.old_value.clone(),
		}
	}
}

// endregion: --- PropChange

// region:    --- PatchFile

/// One file's worth of change: paths, operation, hunks, property changes, and
/// end-of-file newline bookkeeping.
///
/// Invariant: Add has no old content, Delete no new content. `copy_source` is
/// present iff the operation is Copy or Move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFile {
	pub old_path: String,
	pub new_path: String,
	pub operation: PatchOperation,
	pub copy_source: Option<String>,
	pub hunks: Vec<Hunk>,
	pub prop_changes: Vec<PropChange>,
	pub old_has_trailing_newline: bool,
	pub new_has_trailing_newline: bool,
	/// Echoed `(...)` tag from the `---` header line, when one was parsed.
	pub old_tag: Option<String>,
	/// Echoed `(...)` tag from the `+++` header line, when one was parsed.
	pub new_tag: Option<String>,
}

impl PatchFile {
	pub fn new(path: impl Into<String>, operation: PatchOperation) -> Self {
		let path = path.into();
		Self {
			old_path: path.clone(),
			new_path: path,
			operation,
			copy_source: None,
			hunks: Vec::new(),
			prop_changes: Vec::new(),
			old_has_trailing_newline: true,
			new_has_trailing_newline: true,
			old_tag: None,
			new_tag: None,
		}
	}

	pub fn with_hunks(mut self, hunks: Vec<Hunk>) -> Self {
		self.hunks = hunks;
		self
	}

	pub fn with_props(mut self, prop_changes: Vec<PropChange>) -> Self {
		self.prop_changes = prop_changes;
		self
	}

	pub fn with_copy_source(mut self, source: impl Into<String>) -> Self {
		self.copy_source = Some(source.into());
		self
	}

	/// The path this change addresses in the target tree (destination side).
	pub fn target_path(&self) -> &str {
		&self.new_path
	}

	pub fn has_text_changes(&self) -> bool {
		!self.hunks.is_empty()
	}

	/// The inverse change: applying it undoes a forward application.
	///
	/// Add and Delete swap; Move swaps source and destination; Copy reverses
	/// to a Delete of the copy destination.
	pub fn reversed(&self) -> PatchFile {
		let hunks = self.hunks.iter().map(Hunk::reversed).collect();
		let prop_changes = self.prop_changes.iter().map(PropChange::reversed).collect();

		let (operation, old_path, new_path, copy_source) = match self.operation {
			PatchOperation::Modify => (
				PatchOperation::Modify,
				self.new_path.clone(),
				self.old_path.clone(),
				None,
			),
			PatchOperation::Add => (
				PatchOperation::Delete,
				self.new_path.clone(),
				self.new_path.clone(),
				None,
			),
			PatchOperation::Delete => (
				PatchOperation::Add,
				self.old_path.clone(),
				self.old_path.clone(),
				None,
			),
			PatchOperation::Copy => (
				PatchOperation::Delete,
				self.new_path.clone(),
				self.new_path.clone(),
				None,
			),
			PatchOperation::Move => (
				PatchOperation::Move,
				self.new_path.clone(),
				self.old_path.clone(),
				Some(self.new_path.clone()),
			),
		};

		PatchFile {
			old_path,
			new_path,
			operation,
			copy_source,
			hunks,
			prop_changes,
			old_has_trailing_newline: self.new_has_trailing_newline,
			new_has_trailing_newline: self.old_has_trailing_newline,
			old_tag: self.new_tag.clone(),
			new_tag: self.old_tag.clone(),
		}
	}
}

// endregion: --- PatchFile

// region:    --- Tests


// endregion: --- Tests
