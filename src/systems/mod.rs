//! Level systems.
//!
//! This module groups the logic that turns declarative level data into a
//! running schedule and advances it every tick.
//!
//! Submodules overview
//! - [`spawner`] – sorted-list activation engine and per-category driver
//! - [`converter`] – runtime node construction, sequence cache, parent chains
//! - [`prefab`] – prefab instance expansion and collapse
//! - [`propagate_transforms`] – world transforms through parent chains
//! - [`level`] – the level orchestrator: lifecycle, tick, structural edits
//! - [`context`] – sparse per-aspect updates
//! - [`spectrum`] – audio spectrum aggregation worker thread

pub mod context;
pub mod converter;
pub mod level;
pub mod prefab;
pub mod propagate_transforms;
pub mod spawner;
pub mod spectrum;
