//! Command Line Interface (CLI) layer for geoinfer.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) for the resize, classify, detect
//! and train-predict pipelines. It wires user-provided options to the
//! library functionality exposed via `geoinfer::api`.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
