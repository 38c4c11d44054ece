//! Shared fixtures and helpers for the integration tests.
//! Note: each test file pulls this in with `mod test_support;`

#![allow(unused)] // For test support

// region:    --- Modules

mod helpers;

pub use helpers::*;

type TestResult<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

// endregion: --- Modules
