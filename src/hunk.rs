//! Content hunk model: a contiguous block of context/added/removed lines with
//! positions in both the old and the new coordinate space.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
	Context,
	Add,
	Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkLine {
	pub kind: LineKind,
	pub text: String,
}

impl HunkLine {
	pub fn context(text: impl Into<String>) -> Self {
		Self {
			kind: LineKind::Context,
			text: text.into(),
		}
	}

	pub fn add(text: impl Into<String>) -> Self {
		Self {
			kind: LineKind::Add,
			text: text.into(),
		}
	}

	pub fn remove(text: impl Into<String>) -> Self {
		Self {
			kind: LineKind::Remove,
			text: text.into(),
		}
	}
}

/// One hunk of a unified diff. Line numbers are 1-based; a length of 1 may be
/// omitted in textual form.
///
/// Invariant: Context + Remove lines add up to `old_len`, Context + Add lines
/// add up to `new_len`; hunks of one file are sorted by ascending `old_start`
/// and do not overlap in old coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
	pub old_start: usize,
	pub old_len: usize,
	pub new_start: usize,
	pub new_len: usize,
	pub lines: Vec<HunkLine>,
}

impl Hunk {
	pub fn new(old_start: usize, old_len: usize, new_start: usize, new_len: usize, lines: Vec<HunkLine>) -> Self {
		Self {
			old_start,
			old_len,
			new_start,
			new_len,
			lines,
		}
	}

	/// Builds a hunk from its lines alone, deriving both length fields.
	pub fn from_lines(old_start: usize, new_start: usize, lines: Vec<HunkLine>) -> Self {
		let old_len = lines.iter().filter(|l| l.kind != LineKind::Add).count();
		let new_len = lines.iter().filter(|l| l.kind != LineKind::Remove).count();
		Self {
			old_start,
			old_len,
			new_start,
			new_len,
			lines,
		}
	}

	/// Old-side projection: context + removed line texts, in order.
	pub fn old_lines(&self) -> Vec<&str> {
		self.lines
			.iter()
			.filter(|l| l.kind != LineKind::Add)
			.map(|l| l.text.as_str())
			.collect()
	}

	/// New-side projection: context + added line texts, in order.
	pub fn new_lines(&self) -> Vec<&str> {
		self.lines
			.iter()
			.filter(|l| l.kind != LineKind::Remove)
			.map(|l| l.text.as_str())
			.collect()
	}

	/// True when every line is an insertion (no context, nothing removed).
	pub fn is_pure_insert(&self) -> bool {
		self.old_len == 0
	}

	/// Number of leading Context lines (the run before the first Add/Remove).
	pub fn leading_context(&self) -> usize {
		self.lines.iter().take_while(|l| l.kind == LineKind::Context).count()
	}

	/// Number of trailing Context lines.
	pub fn trailing_context(&self) -> usize {
		let n = self.lines.iter().rev().take_while(|l| l.kind == LineKind::Context).count();
		// A hunk of only context lines counts them once, as leading.
		if n == self.lines.len() { 0 } else { n }
	}

	/// The same change with old and new sides swapped, for reverse application.
	pub fn reversed(&self) -> Hunk {
		let lines = self
			.lines
			.iter()
			.map(|l| HunkLine {
				kind: match l.kind {
					LineKind::Context => LineKind::Context,
					LineKind::Add => LineKind::Remove,
					LineKind::Remove => LineKind::Add,
				},
				text: l.text.clone(),
			})
			.collect();

		Hunk {
			old_start: self.new_start,
			old_len: self.new_len,
			new_start: self.old_start,
			new_len: self.old_len,
			lines,
		}
	}
}
