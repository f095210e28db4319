//! Long-lived collaborators and stores used by a running level.
//!
//! This module groups the data a [`LevelContext`](crate::systems::level::LevelContext)
//! owns or talks to: the authoritative record store, configuration, the
//! playback clock, the visual and modifier collaborators, the audio spectrum
//! bridge, and the deferred action queues. Each submodule documents the
//! semantics and intended usage of its resource(s).
//!
//! Overview
//! - `actionqueue` – FIFO queues of deferred level actions
//! - `datastore` – arenas of objects, backgrounds, prefabs and prefab instances
//! - `levelconfig` – INI-backed level settings
//! - `modifiers` – modifier runtime trait and bundle handles
//! - `spectrum` – bridge to the background spectrum worker thread
//! - `visuals` – visual factory trait and visual handles
//! - `worldtime` – playback clock
pub mod actionqueue;
pub mod datastore;
pub mod levelconfig;
pub mod modifiers;
pub mod spectrum;
pub mod visuals;
pub mod worldtime;
