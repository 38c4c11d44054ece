//! Parsed patch stream: ordered PatchFile records plus the file-scoped
//! failures encountered while parsing them.

use crate::PatchFile;

#[derive(Debug, Clone, Default)]
pub struct PatchSet {
	files: Vec<PatchFile>,
	failures: Vec<PatchFailure>,
}

/// A file segment the parser could not turn into a PatchFile. One corrupt
/// segment never blocks the segments around it.
#[derive(Debug, Clone)]
pub struct PatchFailure {
	/// Best-effort path of the offending segment, when one was seen.
	pub path: Option<String>,
	/// 1-based line number in the input stream.
	pub line: usize,
	pub error_msg: String,
}

impl PatchSet {
	pub fn new(files: Vec<PatchFile>, failures: Vec<PatchFailure>) -> Self {
		Self { files, failures }
	}

	pub fn is_empty(&self) -> bool {
		self.files.is_empty() && self.failures.is_empty()
	}

	pub fn files(&self) -> &[PatchFile] {
		&self.files
	}

	pub fn failures(&self) -> &[PatchFailure] {
		&self.failures
	}

	pub fn into_files(self) -> Vec<PatchFile> {
		self.files
	}
}

// region:    --- Iterators

impl PatchSet {
	pub fn iter(&self) -> std::slice::Iter<'_, PatchFile> {
		self.files.iter()
	}
}

impl IntoIterator for PatchSet {
	type Item = PatchFile;
	type IntoIter = std::vec::IntoIter<Self::Item>;

	fn into_iter(self) -> Self::IntoIter {
		self.files.into_iter()
	}
}

impl<'a> IntoIterator for &'a PatchSet {
	type Item = &'a PatchFile;
	type IntoIter = std::slice::Iter<'a, PatchFile>;

	fn into_iter(self) -> Self::IntoIter {
		self.files.iter()
	}
}

// endregion: --- Iterators
