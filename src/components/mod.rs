//! Level data types.
//!
//! This module groups the plain data the engine works on: the authored
//! (declarative) description of a level and the derived runtime records built
//! from it.
//!
//! Submodules overview:
//! - [`background`] – declarative background objects
//! - [`keyframe`] – keyframe tracks and easing curves
//! - [`modifier`] – modifier declarations and bundle ownership
//! - [`object`] – declarative level objects, autokill rules, shapes
//! - [`parentlink`] – per-axis parent settings, parent links and chains
//! - [`prefab`] – prefab templates and prefab instances
//! - [`runtimenode`] – scheduler-owned runtime nodes and their payloads
//! - [`sequence`] – sampled curves built from keyframe tracks
//! - [`transform`] – composed world-space transforms

pub mod background;
pub mod keyframe;
pub mod modifier;
pub mod object;
pub mod parentlink;
pub mod prefab;
pub mod runtimenode;
pub mod sequence;
pub mod transform;
