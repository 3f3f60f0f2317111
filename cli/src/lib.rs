//! Command-line driver for the citation-grounding verifier.

pub mod commands;
pub mod config;
pub mod logging;
pub mod presets;
