//! Batch STEP to STL conversion driver.
//!
//! The binary lives in `main.rs`; the driver itself is a library so the
//! integration tests can run conversions in-process against temp dirs.

pub mod cli;
pub mod info;
pub mod runner;

pub use runner::{run_convert, ConvertConfig, FileOutcome, Status};
