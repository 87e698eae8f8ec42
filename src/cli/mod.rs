//! Command-line interface
//!
//! Argument parsing and command handlers for the `phaseloop` binary.

pub mod args;
pub mod commands;
