//! Level runtime configuration.
//!
//! Settings loaded from an INI configuration file. Provides defaults for a
//! safe startup and methods to load/save configuration.
//!
//! # Configuration File Format
//!
//! ```ini
//! [level]
//! song_length = 120.0
//! seed = 0
//! max_prefab_depth = 8
//!
//! [spectrum]
//! enabled = true
//! interval_ms = 16
//! bins = 256
//! ```

use configparser::ini::Ini;
use log::info;
use std::path::PathBuf;

use crate::error::LevelError;

/// Default safe values for startup
const DEFAULT_SEED: u64 = 0;
const DEFAULT_MAX_PREFAB_DEPTH: usize = 8;
const DEFAULT_SPECTRUM_ENABLED: bool = true;
const DEFAULT_SPECTRUM_INTERVAL_MS: u64 = 16;
const DEFAULT_SPECTRUM_BINS: usize = 256;
const DEFAULT_CONFIG_PATH: &str = "./level.ini";

/// Level runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelConfig {
    /// Song length in seconds, when known. Used by song-length autokill.
    pub song_length: Option<f32>,
    /// Seed for fresh prefab copy identities.
    pub seed: u64,
    /// Maximum nesting of prefab instances inside prefabs.
    pub max_prefab_depth: usize,
    /// Run the spectrum worker thread.
    pub spectrum_enabled: bool,
    /// Aggregation period of the spectrum worker.
    pub spectrum_interval_ms: u64,
    /// Expected number of bins per spectrum frame.
    pub spectrum_bins: usize,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            song_length: None,
            seed: DEFAULT_SEED,
            max_prefab_depth: DEFAULT_MAX_PREFAB_DEPTH,
            spectrum_enabled: DEFAULT_SPECTRUM_ENABLED,
            spectrum_interval_ms: DEFAULT_SPECTRUM_INTERVAL_MS,
            spectrum_bins: DEFAULT_SPECTRUM_BINS,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values.
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), LevelError> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| LevelError::Config(format!("failed to load config file: {}", e)))?;
        self.apply(&config);

        info!(
            "Loaded config: song_length={:?}, seed={}, max_prefab_depth={}, spectrum={} ({}ms, {} bins)",
            self.song_length,
            self.seed,
            self.max_prefab_depth,
            self.spectrum_enabled,
            self.spectrum_interval_ms,
            self.spectrum_bins
        );

        Ok(())
    }

    /// Parse configuration from INI text. Missing values keep their defaults.
    pub fn from_ini_str(text: &str) -> Result<Self, LevelError> {
        let mut config = Ini::new();
        config
            .read(text.to_string())
            .map_err(|e| LevelError::Config(format!("failed to parse config: {}", e)))?;
        let mut out = Self::new();
        out.apply(&config);
        Ok(out)
    }

    fn apply(&mut self, config: &Ini) {
        // [level] section
        if let Some(length) = config.getfloat("level", "song_length").ok().flatten() {
            self.song_length = (length > 0.0).then_some(length as f32);
        }
        if let Some(seed) = config.getuint("level", "seed").ok().flatten() {
            self.seed = seed;
        }
        if let Some(depth) = config.getuint("level", "max_prefab_depth").ok().flatten() {
            self.max_prefab_depth = depth as usize;
        }

        // [spectrum] section
        if let Some(enabled) = config.getbool("spectrum", "enabled").ok().flatten() {
            self.spectrum_enabled = enabled;
        }
        if let Some(interval) = config.getuint("spectrum", "interval_ms").ok().flatten() {
            self.spectrum_interval_ms = interval.max(1);
        }
        if let Some(bins) = config.getuint("spectrum", "bins").ok().flatten() {
            self.spectrum_bins = (bins as usize).max(3);
        }
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), LevelError> {
        let mut config = Ini::new();

        // [level] section
        if let Some(length) = self.song_length {
            config.set("level", "song_length", Some(length.to_string()));
        }
        config.set("level", "seed", Some(self.seed.to_string()));
        config.set(
            "level",
            "max_prefab_depth",
            Some(self.max_prefab_depth.to_string()),
        );

        // [spectrum] section
        config.set("spectrum", "enabled", Some(self.spectrum_enabled.to_string()));
        config.set(
            "spectrum",
            "interval_ms",
            Some(self.spectrum_interval_ms.to_string()),
        );
        config.set("spectrum", "bins", Some(self.spectrum_bins.to_string()));

        config.write(&self.config_path)?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }

    pub fn with_song_length(mut self, length: f32) -> Self {
        self.song_length = Some(length);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn without_spectrum(mut self) -> Self {
        self.spectrum_enabled = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_safe() {
        let cfg = LevelConfig::new();
        assert_eq!(cfg.song_length, None);
        assert_eq!(cfg.max_prefab_depth, DEFAULT_MAX_PREFAB_DEPTH);
        assert!(cfg.spectrum_enabled);
    }

    #[test]
    fn parses_known_keys_and_keeps_defaults() {
        let cfg = LevelConfig::from_ini_str(
            "[level]\nsong_length = 90.5\nseed = 42\n\n[spectrum]\nenabled = false\n",
        )
        .unwrap();
        assert_eq!(cfg.song_length, Some(90.5));
        assert_eq!(cfg.seed, 42);
        assert!(!cfg.spectrum_enabled);
        assert_eq!(cfg.spectrum_interval_ms, DEFAULT_SPECTRUM_INTERVAL_MS);
        assert_eq!(cfg.max_prefab_depth, DEFAULT_MAX_PREFAB_DEPTH);
    }

    #[test]
    fn non_positive_song_length_means_unknown() {
        let cfg = LevelConfig::from_ini_str("[level]\nsong_length = 0\n").unwrap();
        assert_eq!(cfg.song_length, None);
    }

    #[test]
    fn missing_file_is_an_error() {
        let mut cfg = LevelConfig::with_path("/definitely/not/here.ini");
        assert!(matches!(cfg.load_from_file(), Err(LevelError::Config(_))));
    }
}
