//! Per-path application outcomes and the aggregate run report.
//!
//! Statuses are ordered variants, worst last, so a file's final status is the
//! plain maximum of its per-hunk (or per-property) contributions.

use std::fmt;

// region:    --- Statuses

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum TextStatus {
	#[default]
	Unchanged,
	Added,
	Deleted,
	Updated,
	/// Applied, but at an offset or with fuzz, or found already applied.
	Merged,
	Conflicted,
}

impl TextStatus {
	pub fn code(&self) -> char {
		match self {
			TextStatus::Unchanged => ' ',
			TextStatus::Added => 'A',
			TextStatus::Deleted => 'D',
			TextStatus::Updated => 'U',
			TextStatus::Merged => 'G',
			TextStatus::Conflicted => 'C',
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum PropStatus {
	#[default]
	Unchanged,
	Added,
	Deleted,
	Updated,
	Conflicted,
}

impl PropStatus {
	pub fn code(&self) -> char {
		match self {
			PropStatus::Unchanged => ' ',
			PropStatus::Added => 'A',
			PropStatus::Deleted => 'D',
			PropStatus::Updated => 'U',
			PropStatus::Conflicted => 'C',
		}
	}
}

// endregion: --- Statuses

// region:    --- ApplyResult

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictDetail {
	/// A hunk whose old side could not be located. `ordinal` is 1-based.
	Hunk {
		ordinal: usize,
		old_start: usize,
		old_len: usize,
	},
	Prop { name: String },
}

#[derive(Debug, Clone, Default)]
pub struct ApplyResult {
	pub path: String,
	pub text_status: TextStatus,
	pub prop_status: PropStatus,
	pub skipped: bool,
	/// Why the path was skipped or aborted, when it was.
	pub error_msg: Option<String>,
	pub conflicts: Vec<ConflictDetail>,
}

impl ApplyResult {
	pub fn new(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			..Default::default()
		}
	}

	pub fn status_code(&self) -> String {
		format!("{}{}", self.text_status.code(), self.prop_status.code())
	}

	pub fn is_conflicted(&self) -> bool {
		self.text_status == TextStatus::Conflicted || self.prop_status == PropStatus::Conflicted
	}

	/// True when the line carries nothing worth reporting.
	pub fn is_noop(&self) -> bool {
		!self.skipped && self.text_status == TextStatus::Unchanged && self.prop_status == PropStatus::Unchanged
	}
}

impl fmt::Display for ApplyResult {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.skipped {
			write!(f, "Skipped '{}'", self.path)
		} else {
			write!(f, "{}        {}", self.status_code(), self.path)
		}
	}
}

// endregion: --- ApplyResult

// region:    --- Summary & Report

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
	pub skipped_paths: usize,
	pub text_conflicts: usize,
	pub prop_conflicts: usize,
}

impl Summary {
	pub fn is_clean(&self) -> bool {
		self.skipped_paths == 0 && self.text_conflicts == 0 && self.prop_conflicts == 0
	}
}

impl fmt::Display for Summary {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Summary of conflicts:")?;
		if self.skipped_paths > 0 {
			write!(f, "\n  Skipped paths: {}", self.skipped_paths)?;
		}
		if self.text_conflicts > 0 {
			write!(f, "\n  Text conflicts: {}", self.text_conflicts)?;
		}
		if self.prop_conflicts > 0 {
			write!(f, "\n  Property conflicts: {}", self.prop_conflicts)?;
		}
		Ok(())
	}
}

#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
	results: Vec<ApplyResult>,
	summary: Summary,
}

impl ApplyReport {
	pub fn new(results: Vec<ApplyResult>) -> Self {
		let mut summary = Summary::default();
		for result in &results {
			if result.skipped {
				summary.skipped_paths += 1;
			}
			if result.text_status == TextStatus::Conflicted {
				summary.text_conflicts += 1;
			}
			if result.prop_status == PropStatus::Conflicted {
				summary.prop_conflicts += 1;
			}
		}
		Self { results, summary }
	}

	pub fn results(&self) -> &[ApplyResult] {
		&self.results
	}

	pub fn summary(&self) -> Summary {
		self.summary
	}

	pub fn result_for(&self, path: &str) -> Option<&ApplyResult> {
		self.results.iter().find(|r| r.path == path)
	}

	/// Two-character status for `path`, e.g. `"U "` or `" C"`.
	pub fn status_code_for(&self, path: &str) -> Option<String> {
		self.result_for(path).map(ApplyResult::status_code)
	}

	pub fn has_conflicts(&self) -> bool {
		self.summary.text_conflicts > 0 || self.summary.prop_conflicts > 0
	}

	/// The notification block: one line per reported path, then the conflict
	/// summary when the run was not clean.
	pub fn render(&self) -> String {
		let mut out = String::new();
		for result in &self.results {
			if result.is_noop() {
				continue;
			}
			out.push_str(&result.to_string());
			out.push('\n');
		}
		if !self.summary.is_clean() {
			out.push_str(&self.summary.to_string());
			out.push('\n');
		}
		out
	}
}

impl<'a> IntoIterator for &'a ApplyReport {
	type Item = &'a ApplyResult;
	type IntoIter = std::slice::Iter<'a, ApplyResult>;

	fn into_iter(self) -> Self::IntoIter {
		self.results.iter()
	}
}

// endregion: --- Summary & Report

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;

	#[test]
	fn test_apply_report_status_escalation() -> Result<()> {
		// -- Setup & Fixtures
		let mut status = TextStatus::Unchanged;

		// -- Exec & Check
		status = status.max(TextStatus::Updated);
		assert_eq!(status, TextStatus::Updated);
		status = status.max(TextStatus::Merged);
		assert_eq!(status, TextStatus::Merged);
		// A later clean hunk cannot downgrade the file.
		status = status.max(TextStatus::Updated);
		assert_eq!(status, TextStatus::Merged);
		status = status.max(TextStatus::Conflicted);
		assert_eq!(status, TextStatus::Conflicted);

		Ok(())
	}

	#[test]
	fn test_apply_report_render_lines() -> Result<()> {
		// -- Setup & Fixtures
		let mut updated = ApplyResult::new("iota");
		updated.text_status = TextStatus::Updated;

		let mut prop_conflict = ApplyResult::new("A/mu");
		prop_conflict.prop_status = PropStatus::Conflicted;

		let mut skipped = ApplyResult::new("A/B/absent");
		skipped.skipped = true;

		let untouched = ApplyResult::new("A/D/gamma");

		let report = ApplyReport::new(vec![updated, prop_conflict, skipped, untouched]);

		// -- Exec
		let rendered = report.render();

		// -- Check
		let expected = concat!(
			"U         iota\n",
			" C        A/mu\n",
			"Skipped 'A/B/absent'\n",
			"Summary of conflicts:\n",
			"  Skipped paths: 1\n",
			"  Property conflicts: 1\n",
		);
		assert_eq!(rendered, expected);
		assert_eq!(report.status_code_for("iota").as_deref(), Some("U "));
		assert_eq!(report.status_code_for("A/mu").as_deref(), Some(" C"));
		assert_eq!(report.summary().skipped_paths, 1);
		assert!(report.has_conflicts());

		Ok(())
	}

	#[test]
	fn test_apply_report_clean_run_has_no_summary() -> Result<()> {
		// -- Setup & Fixtures
		let mut added = ApplyResult::new("newfile");
		added.text_status = TextStatus::Added;
		let report = ApplyReport::new(vec![added]);

		// -- Exec
		let rendered = report.render();

		// -- Check
		assert_eq!(rendered, "A         newfile\n");
		assert!(report.summary().is_clean());
		assert!(!report.has_conflicts());

		Ok(())
	}
}

// endregion: --- Tests
