//! Event and action types used by the level.
//!
//! Submodules:
//! - [`action`] – sparse update keys and deferred level actions
//! - [`node`] – activation/deactivation notifications delivered by spawners
pub mod action;
pub mod node;
