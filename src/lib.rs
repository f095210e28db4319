//! Aberred Level library.
//!
//! A time-windowed level scheduler: declarative objects with start and kill
//! times, parent chains and prefab instances are converted into runtime
//! nodes, activated and deactivated as the playback clock moves (in either
//! direction), and composed into world transforms every tick.
//!
//! This module exposes the components, resources, systems, and events for
//! use in integration tests and as a reusable library.

pub mod components;
pub mod error;
pub mod events;
pub mod resources;
pub mod systems;
