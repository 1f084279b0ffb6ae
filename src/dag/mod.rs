// src/dag/mod.rs

//! Task graph for the asset pipeline.
//!
//! - [`task`] defines tasks, their composition kind and leaf actions.
//! - [`builder`] assembles and validates a [`TaskGraph`].
//! - [`standard`] wires the built-in tasks (`styles`, `scripts`, `images`,
//!   `watch`, `default`, ...) from a [`crate::config::ConfigFile`].
//!
//! The graph is built once at startup and never mutated afterwards.

pub mod builder;
pub mod standard;
pub mod task;

pub use builder::{TaskGraph, TaskGraphBuilder};
pub use standard::{DEFAULT_TASK, WATCH_TASK};
pub use task::{LeafAction, Task, TaskKind};
