//! Applies PatchFile changes to a TargetTree: hunk matching with offset
//! bookkeeping, already-applied detection, conflict materialization, and
//! property application, reported per path.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, warn};

use crate::apply_report::{ApplyReport, ApplyResult, ConflictDetail, PropStatus, TextStatus};
use crate::matcher::{self, MatchOptions};
use crate::patch_file::{PatchFile, PatchOperation, PropKind};
use crate::patch_set::PatchSet;
use crate::tree::{NodeKind, TargetTree, ancestor_paths};
use crate::{Error, Hunk, Result};

pub const CONFLICT_MARKER_MINE: &str = "<<<<<<< .mine";
pub const CONFLICT_MARKER_SEP: &str = "=======";
pub const CONFLICT_MARKER_THEIRS: &str = ">>>>>>> .theirs";

#[derive(Debug, Clone)]
pub struct ApplyOptions {
	/// Undo: swap each change's old and new sides before applying.
	pub reverse: bool,
	/// Plan and report without touching the tree.
	pub dry_run: bool,
	/// Leading path components stripped from every patch path.
	pub strip: usize,
	/// Delete directories emptied by the deletions of this run.
	pub prune_empty_dirs: bool,
	pub matching: MatchOptions,
}

impl Default for ApplyOptions {
	fn default() -> Self {
		Self {
			reverse: false,
			dry_run: false,
			strip: 0,
			prune_empty_dirs: true,
			matching: MatchOptions::default(),
		}
	}
}

pub fn apply_patch_set(tree: &mut dyn TargetTree, patch_set: &PatchSet, options: &ApplyOptions) -> Result<ApplyReport> {
	apply_patch_files(tree, patch_set.files(), options)
}

/// Applies each PatchFile in order. Per-path problems (missing targets, type
/// conflicts, tree I/O failures) are recorded on that path's result and never
/// abort the run.
pub fn apply_patch_files(tree: &mut dyn TargetTree, files: &[PatchFile], options: &ApplyOptions) -> Result<ApplyReport> {
	let mut run = ApplyRun::new(options);
	for file in files {
		run.apply_file(tree, file);
	}
	Ok(run.into_report())
}

// region:    --- ApplyRun

/// Planned state of a path touched earlier in the run. Consulted before the
/// tree so that a dry run observes its own effects exactly like a real one.
enum Planned {
	File(String),
	Dir,
	Deleted,
}

struct ApplyRun<'a> {
	options: &'a ApplyOptions,
	results: Vec<ApplyResult>,
	/// Paths no longer available to later patches (deleted, moved away, or
	/// skipped).
	terminal: HashSet<String>,
	skipped: HashSet<String>,
	overlay: HashMap<String, Planned>,
}

impl<'a> ApplyRun<'a> {
	fn new(options: &'a ApplyOptions) -> Self {
		Self {
			options,
			results: Vec::new(),
			terminal: HashSet::new(),
			skipped: HashSet::new(),
			overlay: HashMap::new(),
		}
	}

	fn into_report(self) -> ApplyReport {
		ApplyReport::new(self.results)
	}

	fn apply_file(&mut self, tree: &mut dyn TargetTree, patch: &PatchFile) {
		let patch = if self.options.reverse { patch.reversed() } else { patch.clone() };

		let fallback_path = patch.target_path().to_string();
		let patch = match self.strip_patch(patch) {
			Ok(patch) => patch,
			Err(err) => {
				self.record_skip(&fallback_path, &err.to_string());
				return;
			}
		};
		let path = patch.target_path().to_string();

		if self.terminal.contains(&path) {
			debug!(path, "target already deleted or skipped in this run");
			self.record_skip(&path, "target was deleted or skipped earlier in this run");
			return;
		}

		let res: Result<()> = (|| {
			for ancestor in ancestor_paths(&path) {
				if self.skipped.contains(&ancestor) {
					return Err(format!("parent '{ancestor}' was skipped earlier in this run").into());
				}
				if self.eff_kind(&*tree, &ancestor)? == Some(NodeKind::File) {
					return Err(Error::path_type_conflict(ancestor, "directory", "file"));
				}
			}

			match patch.operation {
				PatchOperation::Modify => self.apply_modify(tree, &patch, &path),
				PatchOperation::Add => self.apply_add(tree, &patch, &path),
				PatchOperation::Delete => self.apply_delete(tree, &patch, &path),
				PatchOperation::Copy | PatchOperation::Move => self.apply_copy_or_move(tree, &patch, &path),
			}
		})();

		if let Err(err) = res {
			warn!(path, %err, "target skipped");
			self.record_skip(&path, &err.to_string());
		}
	}

	// -- Operations

	fn apply_modify(&mut self, tree: &mut dyn TargetTree, patch: &PatchFile, path: &str) -> Result<()> {
		match self.eff_kind(&*tree, path)? {
			Some(NodeKind::Dir) => {
				if patch.has_text_changes() {
					return Err(Error::path_type_conflict(path, "file", "directory"));
				}
				// Property-only change addressed at a directory.
				let mut result = ApplyResult::new(path);
				self.apply_props(tree, &mut result, patch)?;
				self.push_result(result);
				Ok(())
			}
			Some(NodeKind::File) => {
				let current = self.eff_read(&*tree, path)?.unwrap_or_default();
				let split = SplitContent::of(&current);
				let outcome = apply_hunks_to(&split.lines, patch, &self.options.matching);
				let final_newline = if outcome.touched_eof {
					patch.new_has_trailing_newline
				} else {
					split.had_final_newline
				};
				let content = join_lines(&outcome.lines, split.ending, final_newline);

				let mut result = ApplyResult::new(path);
				result.text_status = outcome.status;
				result.conflicts = outcome.conflicts;
				if content != current {
					self.plan_write(tree, path, &content)?;
					debug!(path, code = %result.text_status.code(), "content updated");
				}
				self.apply_props(tree, &mut result, patch)?;
				self.push_result(result);
				Ok(())
			}
			None => {
				// Unified diffs express a created file as pure insertions
				// into an empty one.
				if !patch.hunks.is_empty() && patch.hunks.iter().all(Hunk::is_pure_insert) {
					return self.apply_add(tree, patch, path);
				}
				Err(format!("missing target '{path}'").into())
			}
		}
	}

	fn apply_add(&mut self, tree: &mut dyn TargetTree, patch: &PatchFile, path: &str) -> Result<()> {
		let mut content_lines: Vec<String> = Vec::new();
		for hunk in &patch.hunks {
			content_lines.extend(hunk.new_lines().iter().map(|s| s.to_string()));
		}
		let content = join_lines(&content_lines, "\n", patch.new_has_trailing_newline);

		match self.eff_kind(&*tree, path)? {
			Some(NodeKind::Dir) => Err(Error::path_type_conflict(path, "file", "directory")),
			Some(NodeKind::File) => {
				let current = self.eff_read(&*tree, path)?.unwrap_or_default();
				if current != content {
					return Err(format!("target '{path}' already exists with different content").into());
				}
				debug!(path, "added file already present with identical content");
				let mut result = ApplyResult::new(path);
				result.text_status = TextStatus::Merged;
				self.apply_props(tree, &mut result, patch)?;
				self.push_result(result);
				Ok(())
			}
			None => {
				self.ensure_ancestor_dirs(tree, path)?;
				self.plan_write(tree, path, &content)?;
				let mut result = ApplyResult::new(path);
				result.text_status = TextStatus::Added;
				self.apply_props(tree, &mut result, patch)?;
				self.push_result(result);
				Ok(())
			}
		}
	}

	fn apply_delete(&mut self, tree: &mut dyn TargetTree, patch: &PatchFile, path: &str) -> Result<()> {
		match self.eff_kind(&*tree, path)? {
			None => Err(format!("missing target '{path}'").into()),
			Some(NodeKind::Dir) => {
				if patch.has_text_changes() {
					return Err(Error::path_type_conflict(path, "file", "directory"));
				}
				if !self.eff_children(&*tree, path)?.is_empty() {
					return Err(format!("directory '{path}' is not empty").into());
				}
				self.delete_and_prune(tree, path)
			}
			Some(NodeKind::File) => {
				if patch.has_text_changes() {
					// Verify the recorded content against the target; a
					// mismatched delete must not destroy unknown edits.
					let current = self.eff_read(&*tree, path)?.unwrap_or_default();
					let split = SplitContent::of(&current);
					let outcome = apply_hunks_to(&split.lines, patch, &self.options.matching);
					if outcome.status == TextStatus::Conflicted {
						let mut result = ApplyResult::new(path);
						result.text_status = TextStatus::Conflicted;
						result.conflicts = outcome.conflicts;
						self.push_result(result);
						return Ok(());
					}
				}
				self.delete_and_prune(tree, path)
			}
		}
	}

	fn delete_and_prune(&mut self, tree: &mut dyn TargetTree, path: &str) -> Result<()> {
		self.plan_delete(tree, path)?;
		let mut result = ApplyResult::new(path);
		result.text_status = TextStatus::Deleted;
		self.push_result(result);
		self.terminal.insert(path.to_string());
		self.prune_ancestors(tree, path)
	}

	fn apply_copy_or_move(&mut self, tree: &mut dyn TargetTree, patch: &PatchFile, path: &str) -> Result<()> {
		let Some(source) = patch.copy_source.clone() else {
			return Err(format!("{} patch for '{path}' has no source path", patch.operation.as_str()).into());
		};
		let is_move = patch.operation == PatchOperation::Move;

		match self.eff_kind(&*tree, &source)? {
			None => return Err(format!("missing source '{source}'").into()),
			Some(NodeKind::Dir) => return Err(Error::path_type_conflict(source, "file", "directory")),
			Some(NodeKind::File) => (),
		}
		let source_content = self.eff_read(&*tree, &source)?.unwrap_or_default();

		// Hunks, when present, describe edits relative to the source content.
		let split = SplitContent::of(&source_content);
		let outcome = apply_hunks_to(&split.lines, patch, &self.options.matching);
		let final_newline = if outcome.touched_eof {
			patch.new_has_trailing_newline
		} else {
			split.had_final_newline
		};
		let content = join_lines(&outcome.lines, split.ending, final_newline);

		let mut already_present = false;
		match self.eff_kind(&*tree, path)? {
			Some(NodeKind::Dir) => return Err(Error::path_type_conflict(path, "file", "directory")),
			Some(NodeKind::File) => {
				let current = self.eff_read(&*tree, path)?.unwrap_or_default();
				if current != content {
					return Err(format!("target '{path}' already exists with different content").into());
				}
				already_present = true;
			}
			None => {
				self.ensure_ancestor_dirs(tree, path)?;
				self.plan_write(tree, path, &content)?;
			}
		}

		// The destination inherits the source's properties before the
		// patch's own property changes are applied on top.
		for (name, value) in tree.prop_list(&source)? {
			self.plan_prop_set(tree, path, &name, Some(&value))?;
		}

		let mut result = ApplyResult::new(path);
		result.text_status = if outcome.status == TextStatus::Conflicted {
			TextStatus::Conflicted
		} else if already_present {
			TextStatus::Merged
		} else {
			TextStatus::Added
		};
		result.conflicts = outcome.conflicts;
		self.apply_props(tree, &mut result, patch)?;
		self.push_result(result);

		if is_move {
			self.plan_delete(tree, &source)?;
			let mut source_result = ApplyResult::new(source.clone());
			source_result.text_status = TextStatus::Deleted;
			self.push_result(source_result);
			self.terminal.insert(source.clone());
			self.prune_ancestors(tree, &source)?;
		}
		Ok(())
	}

	fn apply_props(&mut self, tree: &mut dyn TargetTree, result: &mut ApplyResult, patch: &PatchFile) -> Result<()> {
		let path = result.path.clone();
		for change in &patch.prop_changes {
			let current = tree.prop_get(&path, &change.name)?;
			let contribution = match change.kind {
				PropKind::Added => {
					let desired = change.new_value.as_deref().unwrap_or("");
					match current.as_deref() {
						None => {
							self.plan_prop_set(tree, &path, &change.name, Some(desired))?;
							PropStatus::Added
						}
						// Already holding the patched value: the kind's status
						// without a write.
						Some(value) if value == desired => PropStatus::Added,
						Some(_) => PropStatus::Conflicted,
					}
				}
				PropKind::Deleted => {
					let expected = change.old_value.as_deref().unwrap_or("");
					match current.as_deref() {
						Some(value) if value == expected => {
							self.plan_prop_set(tree, &path, &change.name, None)?;
							PropStatus::Deleted
						}
						None => PropStatus::Deleted,
						Some(_) => PropStatus::Conflicted,
					}
				}
				PropKind::Modified => {
					let expected = change.old_value.as_deref().unwrap_or("");
					let desired = change.new_value.as_deref().unwrap_or("");
					match current.as_deref() {
						Some(value) if value == expected => {
							self.plan_prop_set(tree, &path, &change.name, Some(desired))?;
							PropStatus::Updated
						}
						Some(value) if value == desired => PropStatus::Updated,
						_ => PropStatus::Conflicted,
					}
				}
			};
			if contribution == PropStatus::Conflicted {
				warn!(path, prop = %change.name, "property value does not match the recorded old value");
				result.conflicts.push(ConflictDetail::Prop {
					name: change.name.clone(),
				});
			}
			result.prop_status = result.prop_status.max(contribution);
		}
		Ok(())
	}

	// -- Tree planning (dry-run aware)

	fn plan_write(&mut self, tree: &mut dyn TargetTree, path: &str, content: &str) -> Result<()> {
		if !self.options.dry_run {
			tree.write(path, content)?;
		}
		self.overlay.insert(path.to_string(), Planned::File(content.to_string()));
		Ok(())
	}

	fn plan_mkdir(&mut self, tree: &mut dyn TargetTree, path: &str) -> Result<()> {
		if !self.options.dry_run {
			tree.mkdir(path)?;
		}
		self.overlay.insert(path.to_string(), Planned::Dir);
		Ok(())
	}

	fn plan_delete(&mut self, tree: &mut dyn TargetTree, path: &str) -> Result<()> {
		if !self.options.dry_run {
			tree.delete(path)?;
		}
		self.overlay.insert(path.to_string(), Planned::Deleted);
		Ok(())
	}

	fn plan_prop_set(&mut self, tree: &mut dyn TargetTree, path: &str, name: &str, value: Option<&str>) -> Result<()> {
		if !self.options.dry_run {
			tree.prop_set(path, name, value)?;
		}
		Ok(())
	}

	fn ensure_ancestor_dirs(&mut self, tree: &mut dyn TargetTree, path: &str) -> Result<()> {
		for ancestor in ancestor_paths(path) {
			if self.eff_kind(&*tree, &ancestor)?.is_none() {
				self.plan_mkdir(tree, &ancestor)?;
				let mut result = ApplyResult::new(ancestor);
				result.text_status = TextStatus::Added;
				self.push_result(result);
			}
		}
		Ok(())
	}

	fn prune_ancestors(&mut self, tree: &mut dyn TargetTree, path: &str) -> Result<()> {
		if !self.options.prune_empty_dirs {
			return Ok(());
		}
		for ancestor in ancestor_paths(path).into_iter().rev() {
			if self.eff_kind(&*tree, &ancestor)? != Some(NodeKind::Dir) {
				break;
			}
			if !self.eff_children(&*tree, &ancestor)?.is_empty() {
				break;
			}
			self.plan_delete(tree, &ancestor)?;
			debug!(dir = %ancestor, "pruned empty directory");
			let mut result = ApplyResult::new(ancestor.clone());
			result.text_status = TextStatus::Deleted;
			self.push_result(result);
			self.terminal.insert(ancestor);
		}
		Ok(())
	}

	// -- Effective tree state (overlay over the target tree)

	fn eff_kind(&self, tree: &dyn TargetTree, path: &str) -> Result<Option<NodeKind>> {
		if path.is_empty() {
			return Ok(Some(NodeKind::Dir));
		}
		match self.overlay.get(path) {
			Some(Planned::File(_)) => Ok(Some(NodeKind::File)),
			Some(Planned::Dir) => Ok(Some(NodeKind::Dir)),
			Some(Planned::Deleted) => Ok(None),
			None => tree.kind(path),
		}
	}

	fn eff_read(&self, tree: &dyn TargetTree, path: &str) -> Result<Option<String>> {
		match self.overlay.get(path) {
			Some(Planned::File(content)) => Ok(Some(content.clone())),
			Some(Planned::Dir) | Some(Planned::Deleted) => Ok(None),
			None => tree.read(path),
		}
	}

	fn eff_children(&self, tree: &dyn TargetTree, path: &str) -> Result<Vec<String>> {
		let mut children: BTreeSet<String> = BTreeSet::new();
		if tree.kind(path)? == Some(NodeKind::Dir) {
			children.extend(tree.list_children(path)?);
		}
		let prefix = format!("{path}/");
		for (planned_path, planned) in &self.overlay {
			let is_child = if path.is_empty() {
				!planned_path.is_empty() && !planned_path.contains('/')
			} else {
				planned_path
					.strip_prefix(&prefix)
					.is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
			};
			if !is_child {
				continue;
			}
			match planned {
				Planned::Deleted => {
					children.remove(planned_path);
				}
				_ => {
					children.insert(planned_path.clone());
				}
			}
		}
		Ok(children.into_iter().collect())
	}

	// -- Records

	fn push_result(&mut self, result: ApplyResult) {
		self.results.push(result);
	}

	fn record_skip(&mut self, path: &str, reason: &str) {
		let mut result = ApplyResult::new(path);
		result.skipped = true;
		result.error_msg = Some(reason.to_string());
		self.results.push(result);
		self.skipped.insert(path.to_string());
		self.terminal.insert(path.to_string());
	}

	fn strip_patch(&self, mut patch: PatchFile) -> Result<PatchFile> {
		let n = self.options.strip;
		if n == 0 {
			return Ok(patch);
		}
		patch.old_path = strip_components(&patch.old_path, n)?;
		patch.new_path = strip_components(&patch.new_path, n)?;
		if let Some(source) = &patch.copy_source {
			patch.copy_source = Some(strip_components(source, n)?);
		}
		Ok(patch)
	}
}

fn strip_components(path: &str, n: usize) -> Result<String> {
	let parts: Vec<&str> = path.split('/').collect();
	if parts.len() <= n {
		return Err(format!("cannot strip {n} component(s) from '{path}'").into());
	}
	Ok(parts[n..].join("/"))
}

// endregion: --- ApplyRun

// region:    --- Hunk Application

struct HunkOutcome {
	lines: Vec<String>,
	status: TextStatus,
	conflicts: Vec<ConflictDetail>,
	/// True when some hunk's landing site reaches the end of the content, so
	/// the patch's trailing-newline claim governs the result.
	touched_eof: bool,
}

/// Applies the patch's hunks to `target` lines, folding each hunk's
/// contribution into one status: clean landings are Updated, displaced or
/// already-applied ones Merged, unlocatable ones Conflicted with markers
/// spliced in at the expected position.
fn apply_hunks_to(target: &[String], patch: &PatchFile, matching: &MatchOptions) -> HunkOutcome {
	let mut lines = target.to_vec();
	let mut delta: isize = 0;
	let mut status = TextStatus::Unchanged;
	let mut conflicts: Vec<ConflictDetail> = Vec::new();
	let mut touched_eof = !patch.old_has_trailing_newline || !patch.new_has_trailing_newline;

	for (idx, hunk) in patch.hunks.iter().enumerate() {
		let old_lines = hunk.old_lines();
		let new_lines = hunk.new_lines();
		if old_lines == new_lines {
			continue;
		}

		// 1-based start; a zero-length old side names the line it inserts
		// after, which is the 0-based insertion index.
		let base = if hunk.old_len == 0 {
			hunk.old_start as isize
		} else {
			hunk.old_start as isize - 1
		};
		let expected = (base + delta).max(0) as usize;

		match matcher::find_hunk_position(&lines, hunk, expected, matching) {
			Some(found) => {
				// When both sides fit at the landing site, the longer side is
				// the one that explains the content there. A strictly longer
				// new side already present means the splice would repeat the
				// change.
				if found.fuzz() == 0
					&& new_lines.len() > old_lines.len()
					&& matcher::matches_window_at(&lines, &new_lines, found.position, matching)
				{
					debug!(hunk = idx + 1, position = found.position, "hunk already applied");
					status = status.max(TextStatus::Merged);
					delta += found.offset + (new_lines.len() as isize - old_lines.len() as isize);
					if found.position + new_lines.len() >= lines.len() {
						touched_eof = true;
					}
					continue;
				}

				let lead = found.fuzz_leading;
				let trail = found.fuzz_trailing;
				let old_trimmed_len = old_lines.len() - lead - trail;
				let replacement: Vec<String> = new_lines[lead..new_lines.len() - trail]
					.iter()
					.map(|s| s.to_string())
					.collect();
				let replacement_len = replacement.len();
				lines.splice(found.position..found.position + old_trimmed_len, replacement);

				if trail == 0 && found.position + replacement_len >= lines.len() {
					touched_eof = true;
				}
				let contribution = if found.is_exact() {
					TextStatus::Updated
				} else {
					TextStatus::Merged
				};
				status = status.max(contribution);
				delta += found.offset + (new_lines.len() as isize - old_lines.len() as isize);
			}
			None => {
				// The old side is out of reach. A hunk whose result already
				// sits at the expected spot is a no-op, not a conflict.
				if !new_lines.is_empty()
					&& matcher::matches_window_at(&lines, &new_lines, expected, matching)
				{
					debug!(hunk = idx + 1, position = expected, "hunk already applied");
					status = status.max(TextStatus::Merged);
					delta += new_lines.len() as isize - old_lines.len() as isize;
					if expected + new_lines.len() >= lines.len() {
						touched_eof = true;
					}
					continue;
				}

				let position = expected.min(lines.len());
				let take = old_lines.len().min(lines.len() - position);
				let mut replacement: Vec<String> = Vec::with_capacity(take + new_lines.len() + 3);
				replacement.push(CONFLICT_MARKER_MINE.to_string());
				replacement.extend(lines[position..position + take].iter().cloned());
				replacement.push(CONFLICT_MARKER_SEP.to_string());
				replacement.extend(new_lines.iter().map(|s| s.to_string()));
				replacement.push(CONFLICT_MARKER_THEIRS.to_string());
				let inserted = replacement.len() as isize;
				lines.splice(position..position + take, replacement);

				warn!(hunk = idx + 1, old_start = hunk.old_start, "hunk could not be located, conflict recorded");
				conflicts.push(ConflictDetail::Hunk {
					ordinal: idx + 1,
					old_start: hunk.old_start,
					old_len: hunk.old_len,
				});
				status = status.max(TextStatus::Conflicted);
				delta += inserted - take as isize;
			}
		}
	}

	HunkOutcome {
		lines,
		status,
		conflicts,
		touched_eof,
	}
}

// endregion: --- Hunk Application

// region:    --- Content Splitting

struct SplitContent {
	lines: Vec<String>,
	ending: &'static str,
	had_final_newline: bool,
}

impl SplitContent {
	/// Splits into terminator-free lines, remembering the dominant line
	/// ending so the result can be rejoined in the target's own style.
	fn of(content: &str) -> Self {
		let crlf = content.matches("\r\n").count();
		let lf = content.matches('\n').count();
		let ending = if lf > 0 && crlf * 2 >= lf { "\r\n" } else { "\n" };
		Self {
			lines: content.lines().map(String::from).collect(),
			ending,
			had_final_newline: content.is_empty() || content.ends_with('\n'),
		}
	}
}

fn join_lines(lines: &[String], ending: &str, final_newline: bool) -> String {
	if lines.is_empty() {
		return String::new();
	}
	let mut out = lines.join(ending);
	if final_newline {
		out.push_str(ending);
	}
	out
}

// endregion: --- Content Splitting

// region:    --- Tests


// endregion: --- Tests
