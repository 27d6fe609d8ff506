// src/config/mod.rs

//! Configuration loading and validation for sitepipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Expand `{src}`-style path variables (`vars.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate references, macro cycles and option bags (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;
pub mod vars;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    ConfigFile, ConfigSection, PathsSection, RawConfigFile, ServerSection, StepSpec,
    TaskConfig, TaskKind, WatchRuleConfig,
};
pub use vars::PathVars;
