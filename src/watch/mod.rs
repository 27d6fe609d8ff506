// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module compiles the `[[watch]]` rules, runs a debounced recursive
//! watcher over the project root and turns each change batch into the list
//! of rules it triggers. It does not run anything itself; the serve loop in
//! `engine::serve` decides what to rebuild and when to reload.

pub mod event_handler;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use event_handler::{select_rules, ChangeBatch};
pub use patterns::{build_rule_profiles, WatchRuleProfile};
pub use watcher::{spawn_watcher, WatcherHandle};
