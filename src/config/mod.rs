//! Configuration management
//!
//! This module handles the node settings: listening address, mining
//! difficulty and the balance policy applied at admission.

pub mod settings;

pub use settings::Config;
