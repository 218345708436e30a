//! Configuration for the `screen` command.
//!
//! Values are layered: built-in defaults, then the TOML file given with
//! `--config`, then command-line flags, then `-S key=value` overrides.

mod builder;
mod defaults;
mod file;
mod models;

pub use builder::build_config;
pub use models::{BoxCenter, DockingStep, OutputTarget};
