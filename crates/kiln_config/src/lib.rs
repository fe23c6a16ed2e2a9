//! Parsing and validation of `kiln.toml` project configuration files.
//!
//! Every section is optional; a project without a `kiln.toml` gets the
//! defaults described on [`ProjectConfig`].

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use types::*;
