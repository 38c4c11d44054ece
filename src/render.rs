//! Renders `PatchFile` values into diff text, either in the traditional
//! `Index:` form or the extended git form.

use crate::hunk::{Hunk, LineKind};
use crate::patch_file::{PatchFile, PatchOperation, PropKind};

pub const SEPARATOR_LINE: &str = "===================================================================";
pub const PROP_SEPARATOR_LINE: &str = "___________________________________________________________________";
pub const NO_NEWLINE_FILE_MARKER: &str = "\\ No newline at end of file";
pub const NO_NEWLINE_PROP_MARKER: &str = "\\ No newline at end of property";

const URL_SCHEMES: [&str; 5] = ["file://", "http://", "https://", "svn://", "svn+ssh://"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiffStyle {
	#[default]
	Traditional,
	Extended,
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
	pub style: DiffStyle,
	/// Tag shown after the `---` path when the PatchFile carries none.
	pub old_tag: String,
	/// Tag shown after the `+++` path when the PatchFile carries none.
	pub new_tag: String,
	/// Optional label appended to the `---` path, for example a repos URL.
	pub src_label: Option<String>,
	/// Optional label appended to the `+++` path.
	pub dst_label: Option<String>,
	/// Render deletions as a bare `Index: <path> (deleted)` header.
	pub no_diff_deleted: bool,
}

impl Default for RenderOptions {
	fn default() -> Self {
		Self {
			style: DiffStyle::default(),
			old_tag: "revision 0".to_string(),
			new_tag: "working copy".to_string(),
			src_label: None,
			dst_label: None,
			no_diff_deleted: false,
		}
	}
}

pub fn render_patch_files(files: &[PatchFile], options: &RenderOptions) -> String {
	let mut out = String::new();
	for file in files {
		out.push_str(&render_patch_file(file, options));
	}
	out
}

pub fn render_patch_file(file: &PatchFile, options: &RenderOptions) -> String {
	let mut out = String::new();

	if file.operation == PatchOperation::Delete && options.no_diff_deleted {
		let path = display_path(&file.old_path);
		out.push_str(&format!("Index: {path} (deleted)\n{SEPARATOR_LINE}\n"));
		return out;
	}

	match options.style {
		DiffStyle::Traditional => render_traditional(&mut out, file, options),
		DiffStyle::Extended => render_extended(&mut out, file, options),
	}

	if !file.prop_changes.is_empty() {
		render_prop_block(&mut out, file);
	}

	out
}

// region:    --- Header Rendering

fn render_traditional(out: &mut String, file: &PatchFile, options: &RenderOptions) {
	let path = display_path(file.target_path());
	let src_label = traditional_label(options.src_label.as_deref());
	let dst_label = traditional_label(options.dst_label.as_deref());
	let old_tag = file.old_tag.as_deref().unwrap_or(&options.old_tag);
	let new_tag = file.new_tag.as_deref().unwrap_or(&options.new_tag);

	out.push_str(&format!("Index: {path}\n{SEPARATOR_LINE}\n"));
	out.push_str(&format!("--- {path}{src_label}\t({old_tag})\n"));
	out.push_str(&format!("+++ {path}{dst_label}\t({new_tag})\n"));
	render_hunks(out, file);
}

fn render_extended(out: &mut String, file: &PatchFile, options: &RenderOptions) {
	let shown = display_path(file.target_path());
	let new_path = display_path(&file.new_path);
	let git_old = display_path(file.copy_source.as_deref().unwrap_or(&file.old_path));
	let old_tag = file.old_tag.as_deref().unwrap_or(&options.old_tag);
	let new_tag = file.new_tag.as_deref().unwrap_or(&options.new_tag);

	out.push_str(&format!("Index: {shown}\n{SEPARATOR_LINE}\n"));
	out.push_str(&format!("diff --git a/{git_old} b/{new_path}\n"));

	match file.operation {
		PatchOperation::Add => out.push_str("new file mode 10644\n"),
		PatchOperation::Delete => out.push_str("deleted file mode 10644\n"),
		PatchOperation::Copy => {
			out.push_str(&format!("copy from {git_old}\n"));
			out.push_str(&format!("copy to {new_path}\n"));
		}
		PatchOperation::Move => {
			out.push_str(&format!("rename from {git_old}\n"));
			out.push_str(&format!("rename to {new_path}\n"));
		}
		PatchOperation::Modify => (),
	}

	// Header-only entry when there is no textual change (pure property
	// change, or copy/rename with identical content).
	if !file.has_text_changes() {
		return;
	}

	let src_label = extended_label(options.src_label.as_deref());
	let dst_label = extended_label(options.dst_label.as_deref());

	match file.operation {
		PatchOperation::Add => {
			out.push_str(&format!("--- /dev/null\t({old_tag})\n"));
			out.push_str(&format!("+++ b/{new_path}{dst_label}\t({new_tag})\n"));
		}
		PatchOperation::Delete => {
			out.push_str(&format!("--- a/{git_old}{src_label}\t({old_tag})\n"));
			out.push_str(&format!("+++ /dev/null\t({new_tag})\n"));
		}
		PatchOperation::Copy | PatchOperation::Move => {
			out.push_str(&format!("--- a/{git_old}{src_label}\t({old_tag})\n"));
			out.push_str(&format!("+++ b/{new_path}\t({new_tag})\n"));
		}
		PatchOperation::Modify => {
			out.push_str(&format!("--- a/{git_old}{src_label}\t({old_tag})\n"));
			out.push_str(&format!("+++ b/{new_path}{dst_label}\t({new_tag})\n"));
		}
	}

	render_hunks(out, file);
}

// endregion: --- Header Rendering

// region:    --- Hunk Rendering

fn render_hunks(out: &mut String, file: &PatchFile) {
	for (hunk_idx, hunk) in file.hunks.iter().enumerate() {
		let is_last = hunk_idx + 1 == file.hunks.len();
		render_hunk(out, hunk, is_last, file);
	}
}

fn render_hunk(out: &mut String, hunk: &Hunk, is_last: bool, file: &PatchFile) {
	out.push_str(&format!(
		"@@ -{} +{} @@\n",
		fmt_range(hunk.old_start, hunk.old_len),
		fmt_range(hunk.new_start, hunk.new_len)
	));

	// A missing trailing newline is flagged right after the closing line of
	// the affected side, once when a shared context line closes both.
	let last_old = hunk
		.lines
		.iter()
		.rposition(|l| matches!(l.kind, LineKind::Context | LineKind::Remove));
	let last_new = hunk
		.lines
		.iter()
		.rposition(|l| matches!(l.kind, LineKind::Context | LineKind::Add));

	for (line_idx, line) in hunk.lines.iter().enumerate() {
		let prefix = match line.kind {
			LineKind::Context => ' ',
			LineKind::Add => '+',
			LineKind::Remove => '-',
		};
		out.push(prefix);
		out.push_str(&line.text);
		out.push('\n');

		if is_last {
			let marks_old = !file.old_has_trailing_newline && last_old == Some(line_idx);
			let marks_new = !file.new_has_trailing_newline && last_new == Some(line_idx);
			if marks_old || marks_new {
				out.push_str(NO_NEWLINE_FILE_MARKER);
				out.push('\n');
			}
		}
	}
}

fn fmt_range(start: usize, len: usize) -> String {
	if len == 1 {
		start.to_string()
	} else {
		format!("{start},{len}")
	}
}

// endregion: --- Hunk Rendering

// region:    --- Property Rendering

fn render_prop_block(out: &mut String, file: &PatchFile) {
	let path = display_path(file.target_path());
	out.push_str(&format!("\nProperty changes on: {path}\n{PROP_SEPARATOR_LINE}\n"));

	for change in &file.prop_changes {
		match change.kind {
			PropKind::Added => {
				out.push_str(&format!("Added: {}\n## -0,0 +1 ##\n", change.name));
				push_prop_val(out, '+', change.new_value.as_deref().unwrap_or(""));
			}
			PropKind::Deleted => {
				out.push_str(&format!("Deleted: {}\n## -1 +0,0 ##\n", change.name));
				push_prop_val(out, '-', change.old_value.as_deref().unwrap_or(""));
			}
			PropKind::Modified => {
				out.push_str(&format!("Modified: {}\n## -1 +1 ##\n", change.name));
				push_prop_val(out, '-', change.old_value.as_deref().unwrap_or(""));
				push_prop_val(out, '+', change.new_value.as_deref().unwrap_or(""));
			}
		}
	}
}

fn push_prop_val(out: &mut String, prefix: char, value: &str) {
	if value.is_empty() {
		out.push(prefix);
		out.push('\n');
		return;
	}
	for segment in value.split_inclusive('\n') {
		out.push(prefix);
		out.push_str(segment);
		if !segment.ends_with('\n') {
			out.push('\n');
		}
	}
	if !value.ends_with('\n') {
		out.push_str(NO_NEWLINE_PROP_MARKER);
		out.push('\n');
	}
}

// endregion: --- Property Rendering

// region:    --- Support

fn display_path(path: &str) -> String {
	path.replace('\\', "/")
}

/// Traditional labels keep absolute URLs as-is; anything else is shown
/// elided as `.../<label>`.
fn traditional_label(label: Option<&str>) -> String {
	match label {
		Some(label) => {
			let label = label.replace('\\', "/");
			if URL_SCHEMES.iter().any(|s| label.starts_with(s)) {
				format!("\t({label})")
			} else {
				format!("\t(.../{label})")
			}
		}
		None => String::new(),
	}
}

fn extended_label(label: Option<&str>) -> String {
	match label {
		Some(label) => format!("\t(.../{})", label.replace('\\', "/")),
		None => String::new(),
	}
}

// endregion: --- Support

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;
	use crate::HunkLine;
	use crate::patch_file::PropChange;

	#[test]
	fn test_render_traditional_modify() -> Result<()> {
		// -- Setup & Fixtures
		let mut file = PatchFile::new("iota", PatchOperation::Modify).with_hunks(vec![Hunk::from_lines(
			1,
			1,
			vec![
				HunkLine::context("This is the file 'iota'."),
				HunkLine::add("Some more bytes"),
			],
		)]);
		file.old_tag = Some("revision 1".to_string());
		file.new_tag = Some("working copy".to_string());

		// -- Exec
		let rendered = render_patch_file(&file, &RenderOptions::default());

		// -- Check
		let expected = concat!(
			"Index: iota\n",
			"===================================================================\n",
			"--- iota\t(revision 1)\n",
			"+++ iota\t(working copy)\n",
			"@@ -1 +1,2 @@\n",
			" This is the file 'iota'.\n",
			"+Some more bytes\n",
		);
		assert_eq!(rendered, expected);

		Ok(())
	}

	#[test]
	fn test_render_extended_add_without_trailing_newline() -> Result<()> {
		// -- Setup & Fixtures
		let mut file =
			PatchFile::new("new", PatchOperation::Add).with_hunks(vec![Hunk::from_lines(0, 1, vec![HunkLine::add("added-line")])]);
		file.new_has_trailing_newline = false;
		let options = RenderOptions {
			style: DiffStyle::Extended,
			..Default::default()
		};

		// -- Exec
		let rendered = render_patch_file(&file, &options);

		// -- Check
		let expected = concat!(
			"Index: new\n",
			"===================================================================\n",
			"diff --git a/new b/new\n",
			"new file mode 10644\n",
			"--- /dev/null\t(revision 0)\n",
			"+++ b/new\t(working copy)\n",
			"@@ -0,0 +1 @@\n",
			"+added-line\n",
			"\\ No newline at end of file\n",
		);
		assert_eq!(rendered, expected);

		Ok(())
	}

	#[test]
	fn test_render_extended_move_header_only() -> Result<()> {
		// -- Setup & Fixtures
		let mut file = PatchFile::new("dir/dest", PatchOperation::Move);
		file.copy_source = Some("dir/source".to_string());
		let options = RenderOptions {
			style: DiffStyle::Extended,
			..Default::default()
		};

		// -- Exec
		let rendered = render_patch_file(&file, &options);

		// -- Check
		let expected = concat!(
			"Index: dir/dest\n",
			"===================================================================\n",
			"diff --git a/dir/source b/dir/dest\n",
			"rename from dir/source\n",
			"rename to dir/dest\n",
		);
		assert_eq!(rendered, expected);

		Ok(())
	}

	#[test]
	fn test_render_no_diff_deleted() -> Result<()> {
		// -- Setup & Fixtures
		let file = PatchFile::new("gone", PatchOperation::Delete).with_hunks(vec![Hunk::from_lines(
			1,
			0,
			vec![HunkLine::remove("old content")],
		)]);
		let options = RenderOptions {
			no_diff_deleted: true,
			..Default::default()
		};

		// -- Exec
		let rendered = render_patch_file(&file, &options);

		// -- Check
		let expected = concat!(
			"Index: gone (deleted)\n",
			"===================================================================\n",
		);
		assert_eq!(rendered, expected);

		Ok(())
	}

	#[test]
	fn test_render_prop_block() -> Result<()> {
		// -- Setup & Fixtures
		let file = PatchFile::new("dir", PatchOperation::Modify).with_props(vec![
			PropChange::added("svn:ignore", "*.o"),
			PropChange::modified("owner", "alice\n", "bob\n"),
			PropChange::deleted("obsolete", "yes\n"),
		]);

		// -- Exec
		let rendered = render_patch_file(&file, &RenderOptions::default());

		// -- Check
		let expected = concat!(
			"Index: dir\n",
			"===================================================================\n",
			"--- dir\t(revision 0)\n",
			"+++ dir\t(working copy)\n",
			"\n",
			"Property changes on: dir\n",
			"___________________________________________________________________\n",
			"Added: svn:ignore\n",
			"## -0,0 +1 ##\n",
			"+*.o\n",
			"\\ No newline at end of property\n",
			"Modified: owner\n",
			"## -1 +1 ##\n",
			"-alice\n",
			"+bob\n",
			"Deleted: obsolete\n",
			"## -1 +0,0 ##\n",
			"-yes\n",
		);
		assert_eq!(rendered, expected);

		Ok(())
	}

	#[test]
	fn test_render_url_label_kept_verbatim() -> Result<()> {
		// -- Setup & Fixtures
		let file = PatchFile::new("A/mu", PatchOperation::Modify).with_hunks(vec![Hunk::from_lines(
			1,
			1,
			vec![HunkLine::remove("old"), HunkLine::add("new")],
		)]);
		let options = RenderOptions {
			src_label: Some("http://host/repos/A/mu".to_string()),
			dst_label: Some("wc/A/mu".to_string()),
			..Default::default()
		};

		// -- Exec
		let rendered = render_patch_file(&file, &options);

		// -- Check
		assert!(rendered.contains("--- A/mu\t(http://host/repos/A/mu)\t(revision 0)\n"));
		assert!(rendered.contains("+++ A/mu\t(.../wc/A/mu)\t(working copy)\n"));

		Ok(())
	}

	#[test]
	fn test_render_shared_context_single_marker() -> Result<()> {
		// -- Setup & Fixtures
		// Last line is context shared by both sides; neither side ends with a
		// newline, so exactly one marker must follow it.
		let mut file = PatchFile::new("tail", PatchOperation::Modify).with_hunks(vec![Hunk::from_lines(
			1,
			1,
			vec![
				HunkLine::remove("first-old"),
				HunkLine::add("first-new"),
				HunkLine::context("last"),
			],
		)]);
		file.old_has_trailing_newline = false;
		file.new_has_trailing_newline = false;

		// -- Exec
		let rendered = render_patch_file(&file, &RenderOptions::default());

		// -- Check
		let marker_count = rendered.matches(NO_NEWLINE_FILE_MARKER).count();
		assert_eq!(marker_count, 1);
		assert!(rendered.ends_with(" last\n\\ No newline at end of file\n"));

		Ok(())
	}
}

// endregion: --- Tests
