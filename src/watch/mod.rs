// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling the per-class globs and their bound tasks (`[watch]`).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Debouncing bursts of events and ignoring saves that did not change a
//!   file's content.
//!
//! It does **not** run tasks; it only turns filesystem changes into
//! `RuntimeEvent::TaskTriggered` events for the runtime.

pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use hash::{compute_file_hash, ContentFingerprints};
pub use patterns::{build_bindings, tasks_for_path, WatchBinding};
pub use watcher::{spawn_watcher, WatchSetup, WatcherHandle};
