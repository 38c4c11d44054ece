// region:    --- Modules

mod applier;
mod apply_report;
mod error;
mod fs_tree;
mod hunk;
mod matcher;
mod parse;
mod patch_file;
mod patch_set;
mod render;
mod tree;

pub use applier::*;
pub use apply_report::*;
pub use error::*;
pub use fs_tree::*;
pub use hunk::*;
pub use matcher::*;
pub use parse::*;
pub use patch_file::*;
pub use patch_set::*;
pub use render::*;
pub use tree::*;

// endregion: --- Modules
