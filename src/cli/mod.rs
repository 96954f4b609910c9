// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! CLI module for running pose assembly.
//!
//! This module contains the command-line interface logic, including argument parsing,
//! console logging macros and the `assemble` command implementation.

// Modules
/// CLI arguments.
pub mod args;

/// Assemble command.
pub mod assemble;

/// Console logging macros and verbosity flag.
pub mod logging;
