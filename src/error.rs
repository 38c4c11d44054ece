use derive_more::{Display, From};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display, From)]
pub enum Error {
	#[from(String, &String, &str)]
	Custom(String),

	// -- Parse
	#[display("malformed patch for '{file}' at line {line}: {reason}")]
	MalformedPatch { file: String, line: usize, reason: String },

	// -- Apply
	#[display("path type conflict on '{path}': expected {expected}, found {found}")]
	PathTypeConflict {
		path: String,
		expected: &'static str,
		found: &'static str,
	},

	#[display("tree access failed for '{path}': {cause}")]
	TreeIo { path: String, cause: String },

	#[display("path '{path}' escapes base dir '{base_dir}'")]
	OutsideBase { path: String, base_dir: String },

	// -- Externals
	#[from]
	Io(std::io::Error),

	#[from]
	SimpleFs(simple_fs::Error),
}

// region:    --- Constructors

impl Error {
	pub fn malformed_patch(file: impl Into<String>, line: usize, reason: impl Into<String>) -> Self {
		Self::MalformedPatch {
			file: file.into(),
			line,
			reason: reason.into(),
		}
	}

	pub fn path_type_conflict(path: impl Into<String>, expected: &'static str, found: &'static str) -> Self {
		Self::PathTypeConflict {
			path: path.into(),
			expected,
			found,
		}
	}

	pub fn tree_io(path: impl Into<String>, cause: impl std::fmt::Display) -> Self {
		Self::TreeIo {
			path: path.into(),
			cause: cause.to_string(),
		}
	}

	pub fn outside_base(path: impl Into<String>, base_dir: impl Into<String>) -> Self {
		Self::OutsideBase {
			path: path.into(),
			base_dir: base_dir.into(),
		}
	}

	pub fn simple_fs(err: simple_fs::Error) -> Self {
		Self::SimpleFs(err)
	}
}

// endregion: --- Constructors

// region:    --- Error Boilerplate

impl std::error::Error for Error {}

// endregion: --- Error Boilerplate
