//! Round-trip coverage: text -> model -> text, and forward -> reverse apply.

type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

use patchtree::{ApplyOptions, DiffStyle, RenderOptions, apply_patch_set, parse_patch_set, render_patch_files};

mod test_support;

#[test]
fn test_roundtrip_traditional_render_is_byte_exact() -> Result<()> {
	// -- Setup & Fixtures
	let input = include_str!("data/greek-update.diff");

	// -- Exec
	let patch_set = parse_patch_set(input)?;
	let rendered = render_patch_files(patch_set.files(), &RenderOptions::default());

	// -- Check
	assert_eq!(rendered, input);

	Ok(())
}

#[test]
fn test_roundtrip_extended_render_reaches_fixpoint() -> Result<()> {
	// -- Setup & Fixtures
	// The fixture mixes traditional and extended segments, so the first
	// rendering normalizes it; from then on parse/render must be stable.
	let input = include_str!("data/git-ops.diff");
	let options = RenderOptions {
		style: DiffStyle::Extended,
		..Default::default()
	};

	// -- Exec
	let once = render_patch_files(parse_patch_set(input)?.files(), &options);
	let twice = render_patch_files(parse_patch_set(&once)?.files(), &options);

	// -- Check
	assert_eq!(once, twice);

	Ok(())
}

#[test]
fn test_roundtrip_forward_then_reverse_restores_tree() -> Result<()> {
	// -- Setup & Fixtures
	let mut tree = test_support::sample_tree();
	let patch_set = parse_patch_set(include_str!("data/greek-update.diff"))?;
	let reverse_options = ApplyOptions {
		reverse: true,
		..Default::default()
	};

	// -- Exec
	let forward = apply_patch_set(&mut tree, &patch_set, &ApplyOptions::default())?;
	let backward = apply_patch_set(&mut tree, &patch_set, &reverse_options)?;

	// -- Check
	assert!(forward.summary().is_clean());
	assert!(backward.summary().is_clean());
	assert_eq!(tree.content_of("iota"), Some("This is the file 'iota'.\n"));
	assert_eq!(tree.content_of("A/mu"), Some("This is the file 'mu'.\n"));
	assert_eq!(tree.content_of("A/B/lambda"), Some("This is the file 'lambda'.\n"));

	Ok(())
}

#[test]
fn test_roundtrip_git_ops_reverse_undoes_tree_ops() -> Result<()> {
	// -- Setup & Fixtures
	let mut tree = test_support::sample_tree();
	let patch_set = parse_patch_set(include_str!("data/git-ops.diff"))?;
	let reverse_options = ApplyOptions {
		reverse: true,
		..Default::default()
	};

	// -- Exec
	let forward = apply_patch_set(&mut tree, &patch_set, &ApplyOptions::default())?;
	let backward = apply_patch_set(&mut tree, &patch_set, &reverse_options)?;

	// -- Check
	assert!(forward.summary().is_clean());
	// Reversing the add deletes the file and prunes A/B; reversing the delete
	// recreates A/B and restores lambda; the rename goes back; the added
	// property is removed again.
	let expected = concat!(
		"D         A/B/new-file\n",
		"D         A/B\n",
		"A         A/B\n",
		"A         A/B/lambda\n",
		"A         A/mu\n",
		"D         A/mu2\n",
		" D        iota\n",
	);
	assert_eq!(backward.render(), expected);
	assert_eq!(tree.content_of("iota"), Some("This is the file 'iota'.\n"));
	assert_eq!(tree.content_of("A/mu"), Some("This is the file 'mu'.\n"));
	assert_eq!(tree.content_of("A/B/lambda"), Some("This is the file 'lambda'.\n"));
	assert_eq!(tree.content_of("A/mu2"), None);
	assert_eq!(tree.content_of("A/B/new-file"), None);
	assert!(tree.has_dir("A/B"));
	assert_eq!(tree.prop_of("iota", "svn:eol-style"), None);

	Ok(())
}

#[test]
fn test_roundtrip_no_newline_marker_survives() -> Result<()> {
	// -- Setup & Fixtures
	let input = concat!(
		"Index: iota\n",
		"===================================================================\n",
		"--- iota\t(revision 2)\n",
		"+++ iota\t(working copy)\n",
		"@@ -1 +1,2 @@\n",
		" This is the file 'iota'.\n",
		"+Some more bytes\n",
		"\\ No newline at end of file\n",
	);
	let mut tree = test_support::sample_tree();

	// -- Exec
	let patch_set = parse_patch_set(input)?;
	let rendered = render_patch_files(patch_set.files(), &RenderOptions::default());
	let report = apply_patch_set(&mut tree, &patch_set, &ApplyOptions::default())?;

	// -- Check
	let file = &patch_set.files()[0];
	assert!(file.old_has_trailing_newline);
	assert!(!file.new_has_trailing_newline);
	assert_eq!(rendered, input);
	assert_eq!(report.status_code_for("iota").as_deref(), Some("U "));
	assert_eq!(tree.content_of("iota"), Some("This is the file 'iota'.\nSome more bytes"));

	Ok(())
}
