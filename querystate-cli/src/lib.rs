//! # querystate-cli
//!
//! CLI library for inspecting and rewriting query strings against a
//! querystate form manifest.
//!
//! ## Architecture
//!
//! - [`commands`] - decode, set, defaults and check, returning plain values
//! - [`error`] - Error types and handling

pub mod commands;
pub mod error;

pub use commands::{check, decode, defaults, load_form, set, FieldSummary};
pub use error::{CliError, CliResult};
