//! Crate error type.
//!
//! Only entry points that touch the outside world (files, JSON, INI) or that
//! are asked about an id the store does not know return [`LevelError`].
//! Inconsistent level data is never an error: the engine logs it and falls
//! back to a safe default.

use thiserror::Error;

/// Errors surfaced by the public API.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid level json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("unknown object '{0}'")]
    UnknownObject(String),

    #[error("unknown background object '{0}'")]
    UnknownBackground(String),

    #[error("unknown prefab '{0}'")]
    UnknownPrefab(String),

    #[error("unknown prefab object '{0}'")]
    UnknownPrefabObject(String),

    /// A visual payload could not be built (missing sprite, font, ...).
    #[error("missing asset '{0}'")]
    MissingAsset(String),
}
