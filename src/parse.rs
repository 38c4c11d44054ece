//! Parses diff text into a `PatchSet`. Accepts the traditional `Index:`
//! form, the extended git form, and standalone property blocks; one corrupt
//! segment is recorded as a failure without blocking the rest of the stream.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::patch_file::{PatchFile, PatchOperation, PropChange, PropKind};
use crate::patch_set::{PatchFailure, PatchSet};
use crate::{Error, Hunk, HunkLine, LineKind, Result};

static RE_HUNK_HEADER: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").unwrap());
static RE_PROP_RANGE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^## -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? ##").unwrap());

pub fn parse_patch_set(input: &str) -> Result<PatchSet> {
	let stream = Stream::new(input);
	let mut files: Vec<PatchFile> = Vec::new();
	let mut failures: Vec<PatchFailure> = Vec::new();

	let mut cursor = 0;
	while cursor < stream.lines.len() {
		if !is_segment_anchor(stream.lines[cursor]) {
			cursor += 1;
			continue;
		}
		let start = cursor;
		let parsed = if stream.lines[start].starts_with("Property changes on: ") {
			parse_prop_segment(&stream, start)
		} else {
			parse_file_segment(&stream, start)
		};
		match parsed {
			Ok((file, next)) => {
				files.push(file);
				cursor = next;
			}
			Err(err) => {
				failures.push(failure_from(err, start + 1));
				cursor = next_anchor(&stream, start + 1);
			}
		}
	}

	Ok(PatchSet::new(files, failures))
}

// region:    --- Stream

struct Stream<'a> {
	lines: Vec<&'a str>,
	has_final_newline: bool,
}

impl<'a> Stream<'a> {
	fn new(input: &'a str) -> Self {
		Self {
			lines: input.lines().collect(),
			has_final_newline: input.is_empty() || input.ends_with('\n'),
		}
	}

	/// True when the line at `idx` is the stream's last and has no terminator.
	fn unterminated(&self, idx: usize) -> bool {
		!self.has_final_newline && idx + 1 == self.lines.len()
	}
}

fn is_segment_anchor(line: &str) -> bool {
	line.starts_with("Index: ") || line.starts_with("diff --git ") || line.starts_with("Property changes on: ")
}

fn next_anchor(stream: &Stream, from: usize) -> usize {
	(from..stream.lines.len())
		.find(|&i| is_segment_anchor(stream.lines[i]))
		.unwrap_or(stream.lines.len())
}

fn is_underscore_separator(line: &str) -> bool {
	line.len() >= 10 && line.bytes().all(|b| b == b'_')
}

fn failure_from(err: Error, fallback_line: usize) -> PatchFailure {
	let error_msg = err.to_string();
	match err {
		Error::MalformedPatch { file, line, .. } => PatchFailure {
			path: (!file.is_empty()).then_some(file),
			line,
			error_msg,
		},
		_ => PatchFailure {
			path: None,
			line: fallback_line,
			error_msg,
		},
	}
}

// endregion: --- Stream

// region:    --- File Segments

fn parse_file_segment(stream: &Stream, start: usize) -> Result<(PatchFile, usize)> {
	let mut idx = start;

	let mut index_path: Option<String> = None;
	// Best path known so far, for property matching and error reporting.
	let mut seg_path: Option<String> = None;
	let mut header_only_delete = false;
	if let Some(rest) = stream.lines[idx].strip_prefix("Index: ") {
		let rest = rest.trim_end();
		if let Some(path) = rest.strip_suffix(" (deleted)") {
			index_path = Some(path.to_string());
			header_only_delete = true;
		} else {
			index_path = Some(rest.to_string());
		}
		seg_path = index_path.clone();
		idx += 1;
	}

	let mut git_seen = false;
	let mut git_old: Option<String> = None;
	let mut git_new: Option<String> = None;
	let mut operation = if header_only_delete {
		PatchOperation::Delete
	} else {
		PatchOperation::Modify
	};
	let mut copy_from: Option<String> = None;
	let mut copy_to: Option<String> = None;
	let mut rename_from: Option<String> = None;
	let mut rename_to: Option<String> = None;
	let mut old_header: Option<SideHeader> = None;
	let mut new_header: Option<SideHeader> = None;
	let mut hunks: Vec<Hunk> = Vec::new();
	let mut prop_changes: Vec<PropChange> = Vec::new();
	let mut old_has_trailing_newline = true;
	let mut new_has_trailing_newline = true;

	while idx < stream.lines.len() {
		let line = stream.lines[idx];

		if line.starts_with("Index: ") {
			break;
		}
		if let Some(rest) = line.strip_prefix("diff --git ") {
			let segment_has_content =
				git_seen || header_only_delete || old_header.is_some() || !hunks.is_empty() || !prop_changes.is_empty();
			if segment_has_content {
				break;
			}
			let (a, b) = parse_git_paths(rest, idx + 1)?;
			git_old = Some(a);
			if seg_path.is_none() {
				seg_path = Some(b.clone());
			}
			git_new = Some(b);
			git_seen = true;
			idx += 1;
			continue;
		}
		if let Some(rest) = line.strip_prefix("Property changes on: ") {
			let prop_path = rest.trim_end();
			if seg_path.as_deref() == Some(prop_path) {
				idx = parse_prop_block(stream, idx + 1, &mut prop_changes)?;
				continue;
			}
			break;
		}
		if RE_HUNK_HEADER.is_match(line) {
			let err_path = seg_path.clone().unwrap_or_default();
			let parsed = parse_hunk(stream, idx, &err_path)?;
			if let Some(prev) = hunks.last() {
				if parsed.hunk.old_start < prev.old_start + prev.old_len {
					return Err(Error::malformed_patch(
						err_path,
						idx + 1,
						"hunks are not in ascending order",
					));
				}
			}
			old_has_trailing_newline &= !parsed.clears_old_newline;
			new_has_trailing_newline &= !parsed.clears_new_newline;
			idx = parsed.next;
			hunks.push(parsed.hunk);
			continue;
		}

		if line.starts_with("new file mode") {
			operation = PatchOperation::Add;
		} else if line.starts_with("deleted file mode") {
			operation = PatchOperation::Delete;
		} else if let Some(path) = line.strip_prefix("copy from ") {
			copy_from = Some(path.trim_end().to_string());
			operation = PatchOperation::Copy;
		} else if let Some(path) = line.strip_prefix("copy to ") {
			copy_to = Some(path.trim_end().to_string());
			operation = PatchOperation::Copy;
		} else if let Some(path) = line.strip_prefix("rename from ") {
			rename_from = Some(path.trim_end().to_string());
			operation = PatchOperation::Move;
		} else if let Some(path) = line.strip_prefix("rename to ") {
			rename_to = Some(path.trim_end().to_string());
			operation = PatchOperation::Move;
		} else if let Some(rest) = line.strip_prefix("--- ") {
			old_header = Some(parse_side_header(rest, git_seen, "a/"));
		} else if let Some(rest) = line.strip_prefix("+++ ") {
			let header = parse_side_header(rest, git_seen, "b/");
			if seg_path.is_none() {
				seg_path = header.path.clone();
			}
			new_header = Some(header);
		}
		// Anything else (separator, `index <sha>`, mode churn, junk) is skipped.

		idx += 1;
	}

	// Sides marked absent override the extended classification.
	if operation == PatchOperation::Modify {
		if old_header.as_ref().is_some_and(|h| h.absent) {
			operation = PatchOperation::Add;
		} else if new_header.as_ref().is_some_and(|h| h.absent) {
			operation = PatchOperation::Delete;
		}
	}

	let path_of = |side: &Option<SideHeader>| side.as_ref().and_then(|h| h.path.clone());

	let mut file = match operation {
		PatchOperation::Add => {
			let path = path_of(&new_header)
				.or(git_new)
				.or(index_path)
				.ok_or_else(|| Error::malformed_patch("", start + 1, "added file has no usable path"))?;
			PatchFile::new(path, PatchOperation::Add)
		}
		PatchOperation::Delete => {
			let path = path_of(&old_header)
				.or(git_old)
				.or(index_path)
				.ok_or_else(|| Error::malformed_patch("", start + 1, "deleted file has no usable path"))?;
			PatchFile::new(path, PatchOperation::Delete)
		}
		PatchOperation::Copy => {
			let source = copy_from
				.or(git_old)
				.ok_or_else(|| Error::malformed_patch("", start + 1, "copy without a source path"))?;
			let dest = copy_to
				.or(git_new)
				.or(index_path)
				.ok_or_else(|| Error::malformed_patch("", start + 1, "copy without a destination path"))?;
			let mut file = PatchFile::new(dest, PatchOperation::Copy).with_copy_source(source.clone());
			file.old_path = source;
			file
		}
		PatchOperation::Move => {
			let source = rename_from
				.or(git_old)
				.ok_or_else(|| Error::malformed_patch("", start + 1, "rename without a source path"))?;
			let dest = rename_to
				.or(git_new)
				.or(index_path)
				.ok_or_else(|| Error::malformed_patch("", start + 1, "rename without a destination path"))?;
			let mut file = PatchFile::new(dest, PatchOperation::Move).with_copy_source(source.clone());
			file.old_path = source;
			file
		}
		PatchOperation::Modify => {
			let path = path_of(&new_header)
				.or(index_path)
				.or(git_new)
				.or_else(|| path_of(&old_header))
				.or(git_old)
				.ok_or_else(|| Error::malformed_patch("", start + 1, "segment has no usable path"))?;
			PatchFile::new(path, PatchOperation::Modify)
		}
	};

	file.hunks = hunks;
	file.prop_changes = prop_changes;
	file.old_has_trailing_newline = old_has_trailing_newline;
	file.new_has_trailing_newline = new_has_trailing_newline;
	file.old_tag = old_header.and_then(|h| h.tag);
	file.new_tag = new_header.and_then(|h| h.tag);

	Ok((file, idx))
}

struct SideHeader {
	path: Option<String>,
	absent: bool,
	tag: Option<String>,
}

/// Parses the remainder of a `---`/`+++` line: path, optional `\t(...)`
/// groups with the tag last, `/dev/null` marking the side absent.
fn parse_side_header(rest: &str, git_seen: bool, side_prefix: &str) -> SideHeader {
	let (raw_path, tag) = match rest.split_once('\t') {
		Some((path, tag_part)) => {
			let tag = tag_part
				.rsplit('\t')
				.next()
				.map(str::trim)
				.and_then(|t| t.strip_prefix('('))
				.and_then(|t| t.strip_suffix(')'))
				.map(String::from);
			(path.trim_end(), tag)
		}
		None => (rest.trim_end(), None),
	};

	if raw_path == "/dev/null" {
		return SideHeader {
			path: None,
			absent: true,
			tag,
		};
	}

	let path = if git_seen {
		raw_path.strip_prefix(side_prefix).unwrap_or(raw_path)
	} else {
		raw_path
	};
	SideHeader {
		path: Some(path.to_string()),
		absent: false,
		tag,
	}
}

fn parse_git_paths(rest: &str, line_no: usize) -> Result<(String, String)> {
	let (a_part, b_part) = rest
		.split_once(" b/")
		.ok_or_else(|| Error::malformed_patch("", line_no, "diff --git line without 'b/' side"))?;
	let a_part = a_part.strip_prefix("a/").unwrap_or(a_part);
	Ok((a_part.to_string(), b_part.trim_end().to_string()))
}

// endregion: --- File Segments

// region:    --- Hunks

struct ParsedHunk {
	hunk: Hunk,
	next: usize,
	clears_old_newline: bool,
	clears_new_newline: bool,
}

/// Consumes one hunk, count-driven: exactly `old_len` old-side and `new_len`
/// new-side lines, with `\`-marker lines interleaved. Hitting a structural
/// boundary or the end of the stream with counts left is malformed.
fn parse_hunk(stream: &Stream, start: usize, seg_path: &str) -> Result<ParsedHunk> {
	let header = stream.lines[start];
	let caps = RE_HUNK_HEADER
		.captures(header)
		.ok_or_else(|| Error::malformed_patch(seg_path, start + 1, "invalid hunk header"))?;

	let old_start = cap_num(&caps, 1, seg_path, start + 1)?;
	let old_len = cap_num_or(&caps, 2, 1, seg_path, start + 1)?;
	let new_start = cap_num(&caps, 3, seg_path, start + 1)?;
	let new_len = cap_num_or(&caps, 4, 1, seg_path, start + 1)?;

	let mut lines: Vec<HunkLine> = Vec::with_capacity(old_len + new_len);
	let mut old_rem = old_len;
	let mut new_rem = new_len;
	let mut clears_old_newline = false;
	let mut clears_new_newline = false;
	let mut last_kind: Option<LineKind> = None;

	let mut idx = start + 1;
	while old_rem > 0 || new_rem > 0 {
		let line = *stream.lines.get(idx).ok_or_else(|| {
			Error::malformed_patch(seg_path, idx, "hunk body ends before the declared line counts are satisfied")
		})?;

		if let Some(marker_kind) = last_kind.filter(|_| line.starts_with('\\')) {
			apply_newline_marker(marker_kind, &mut clears_old_newline, &mut clears_new_newline);
			idx += 1;
			continue;
		}
		if is_segment_anchor(line) || RE_HUNK_HEADER.is_match(line) {
			return Err(Error::malformed_patch(
				seg_path,
				idx + 1,
				"hunk body ends before the declared line counts are satisfied",
			));
		}

		let (kind, text) = match line.chars().next() {
			Some(' ') => (LineKind::Context, &line[1..]),
			Some('+') => (LineKind::Add, &line[1..]),
			Some('-') => (LineKind::Remove, &line[1..]),
			// Mailers strip trailing whitespace; a fully blank line is an
			// empty context line.
			None => (LineKind::Context, ""),
			Some(_) => {
				return Err(Error::malformed_patch(seg_path, idx + 1, "unexpected line in hunk body"));
			}
		};

		match kind {
			LineKind::Context => {
				if old_rem == 0 || new_rem == 0 {
					return Err(Error::malformed_patch(seg_path, idx + 1, "hunk has more lines than declared"));
				}
				old_rem -= 1;
				new_rem -= 1;
			}
			LineKind::Add => {
				if new_rem == 0 {
					return Err(Error::malformed_patch(seg_path, idx + 1, "hunk has more lines than declared"));
				}
				new_rem -= 1;
			}
			LineKind::Remove => {
				if old_rem == 0 {
					return Err(Error::malformed_patch(seg_path, idx + 1, "hunk has more lines than declared"));
				}
				old_rem -= 1;
			}
		}

		// The stream itself may stop mid-line; that last line then has no
		// trailing newline even without an explicit marker.
		if stream.unterminated(idx) {
			apply_newline_marker(kind, &mut clears_old_newline, &mut clears_new_newline);
		}

		lines.push(HunkLine {
			kind,
			text: text.to_string(),
		});
		last_kind = Some(kind);
		idx += 1;
	}

	// A marker right after the final content line.
	if let Some(marker_kind) = last_kind {
		if stream.lines.get(idx).is_some_and(|l| l.starts_with('\\')) {
			apply_newline_marker(marker_kind, &mut clears_old_newline, &mut clears_new_newline);
			idx += 1;
		}
	}

	Ok(ParsedHunk {
		hunk: Hunk::new(old_start, old_len, new_start, new_len, lines),
		next: idx,
		clears_old_newline,
		clears_new_newline,
	})
}

fn apply_newline_marker(kind: LineKind, clears_old: &mut bool, clears_new: &mut bool) {
	match kind {
		LineKind::Context => {
			*clears_old = true;
			*clears_new = true;
		}
		LineKind::Remove => *clears_old = true,
		LineKind::Add => *clears_new = true,
	}
}

fn cap_num(caps: &regex::Captures, group: usize, seg_path: &str, line_no: usize) -> Result<usize> {
	caps.get(group)
		.and_then(|m| m.as_str().parse().ok())
		.ok_or_else(|| Error::malformed_patch(seg_path, line_no, "hunk header range out of bounds"))
}

fn cap_num_or(caps: &regex::Captures, group: usize, default: usize, seg_path: &str, line_no: usize) -> Result<usize> {
	match caps.get(group) {
		Some(m) => m
			.as_str()
			.parse()
			.map_err(|_| Error::malformed_patch(seg_path, line_no, "hunk header range out of bounds")),
		None => Ok(default),
	}
}

// endregion: --- Hunks

// region:    --- Property Blocks

fn parse_prop_segment(stream: &Stream, start: usize) -> Result<(PatchFile, usize)> {
	let path = stream.lines[start]
		.strip_prefix("Property changes on: ")
		.map(str::trim_end)
		.ok_or_else(|| Error::malformed_patch("", start + 1, "invalid property header"))?;

	let mut prop_changes: Vec<PropChange> = Vec::new();
	let next = parse_prop_block(stream, start + 1, &mut prop_changes)?;
	let file = PatchFile::new(path, PatchOperation::Modify).with_props(prop_changes);
	Ok((file, next))
}

/// Consumes property entries (`Added:`/`Deleted:`/`Modified:` with their
/// value lines) until a line that belongs to no entry.
fn parse_prop_block(stream: &Stream, mut idx: usize, out: &mut Vec<PropChange>) -> Result<usize> {
	if stream.lines.get(idx).is_some_and(|l| is_underscore_separator(l)) {
		idx += 1;
	}

	while idx < stream.lines.len() {
		let line = stream.lines[idx];
		let (kind, name) = if let Some(name) = line.strip_prefix("Added: ") {
			(PropKind::Added, name)
		} else if let Some(name) = line.strip_prefix("Deleted: ") {
			(PropKind::Deleted, name)
		} else if let Some(name) = line.strip_prefix("Modified: ") {
			(PropKind::Modified, name)
		} else {
			break;
		};
		let name = name.trim_end().to_string();
		idx += 1;

		// Range marker carries no positional meaning for properties.
		if stream.lines.get(idx).is_some_and(|l| RE_PROP_RANGE.is_match(l)) {
			idx += 1;
		}

		let mut old_value: Option<String> = None;
		let mut new_value: Option<String> = None;
		let mut last_side: Option<char> = None;
		while idx < stream.lines.len() {
			let value_line = stream.lines[idx];
			if let Some(text) = value_line.strip_prefix('+') {
				push_value_line(&mut new_value, text, stream.unterminated(idx));
				last_side = Some('+');
			} else if let Some(text) = value_line.strip_prefix('-') {
				push_value_line(&mut old_value, text, stream.unterminated(idx));
				last_side = Some('-');
			} else if value_line.starts_with('\\') {
				match last_side {
					Some('+') => trim_value_newline(&mut new_value),
					Some('-') => trim_value_newline(&mut old_value),
					_ => (),
				}
			} else {
				break;
			}
			idx += 1;
		}

		let change = match kind {
			PropKind::Added => PropChange::added(name, new_value.unwrap_or_default()),
			PropKind::Deleted => PropChange::deleted(name, old_value.unwrap_or_default()),
			PropKind::Modified => {
				PropChange::modified(name, old_value.unwrap_or_default(), new_value.unwrap_or_default())
			}
		};
		out.push(change);
	}

	Ok(idx)
}

fn push_value_line(value: &mut Option<String>, text: &str, unterminated: bool) {
	let buf = value.get_or_insert_with(String::new);
	buf.push_str(text);
	if !unterminated {
		buf.push('\n');
	}
}

fn trim_value_newline(value: &mut Option<String>) {
	if let Some(buf) = value {
		if buf.ends_with('\n') {
			buf.pop();
		}
	}
}

// endregion: --- Property Blocks

// region:    --- Tests


// endregion: --- Tests
