//! Command-line interface
//!
//! This module contains the CLI commands and argument parsing
//! for the node and its wallet client.

pub mod commands;

pub use commands::{Command, Opt, DEFAULT_NODE};
