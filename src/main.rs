//! Aberred Level command line runner.
//!
//! Loads a JSON level, schedules it headless, and ticks it over a time range,
//! logging which objects become active. Useful for checking a level's timing
//! without a renderer.
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- level.json --from 0 --to 30 --step 0.5 --seek 10
//! ```
//!
//! Set `RUST_LOG=debug` (or `trace`) for per-node detail.

use std::path::{Path, PathBuf};

use aberredlevel::components::object::Shape;
use aberredlevel::components::transform::WorldTransform;
use aberredlevel::error::LevelError;
use aberredlevel::resources::datastore::{DataStore, LevelData};
use aberredlevel::resources::levelconfig::LevelConfig;
use aberredlevel::resources::modifiers::NullModifiers;
use aberredlevel::resources::spectrum::SpectrumBridge;
use aberredlevel::resources::visuals::{VisualFactory, VisualHandle, VisualSource};
use aberredlevel::resources::worldtime::WorldTime;
use aberredlevel::systems::level::LevelContext;
use clap::Parser;
use log::{debug, info, trace};

/// Aberred Level runner
#[derive(Parser)]
#[command(
    version,
    about = "Schedules a level headless and logs activations over a time range."
)]
struct Cli {
    /// Level file (JSON).
    #[arg(value_name = "LEVEL")]
    level: PathBuf,

    /// INI configuration file (default: ./level.ini when present).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// First tick time in seconds.
    #[arg(long, default_value_t = 0.0)]
    from: f32,

    /// Last tick time in seconds (default: song length, or 60).
    #[arg(long)]
    to: Option<f32>,

    /// Seconds between ticks.
    #[arg(long, default_value_t = 0.5)]
    step: f32,

    /// Seek to this time after the forward run. Repeatable.
    #[arg(long)]
    seek: Vec<f32>,
}

/// Visual factory that only logs, and fails for image files that do not exist.
#[derive(Default)]
struct LoggingVisuals {
    next: u64,
    live: usize,
}

impl VisualFactory for LoggingVisuals {
    fn create(&mut self, source: VisualSource<'_>) -> Result<VisualHandle, LevelError> {
        let shape = match source {
            VisualSource::Object(o) => &o.shape,
            VisualSource::Background(b) => &b.shape,
        };
        if let Shape::Image { path } = shape {
            if !Path::new(path).exists() {
                return Err(LevelError::MissingAsset(path.clone()));
            }
        }
        self.next += 1;
        self.live += 1;
        debug!("visual {} built for '{}'", self.next, source.id());
        Ok(VisualHandle(self.next))
    }

    fn destroy(&mut self, handle: VisualHandle) {
        self.live = self.live.saturating_sub(1);
        debug!("visual {} destroyed", handle.0);
    }

    fn set_active(&mut self, handle: VisualHandle, active: bool) {
        trace!("visual {} active={}", handle.0, active);
    }

    fn update(&mut self, handle: VisualHandle, transform: &WorldTransform, color: f32) {
        trace!(
            "visual {} at ({:.2}, {:.2}) rot {:.1} color {:.2}",
            handle.0,
            transform.position.x,
            transform.position.y,
            transform.rotation_degrees,
            color
        );
    }
}

fn report(level: &LevelContext<LoggingVisuals, NullModifiers>) {
    let activated = level.events().iter().filter(|e| e.is_activation()).count();
    let deactivated = level.events().len() - activated;
    info!(
        "t={:>7.2}  active objects={:<4} backgrounds={:<4} (+{} -{})",
        level.time(),
        level.active_object_ids().len(),
        level.active_background_ids().len(),
        activated,
        deactivated
    );
}

fn run(cli: Cli) -> Result<(), LevelError> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = LevelConfig::with_path(path);
            config.load_from_file()?;
            config
        }
        None => {
            let mut config = LevelConfig::new();
            config.load_from_file().ok(); // ignore errors, use defaults
            config
        }
    };
    if cli.step <= 0.0 {
        return Err(LevelError::Config(format!(
            "step must be positive, got {}",
            cli.step
        )));
    }

    let data = LevelData::load_from_file(&cli.level)?;
    let store = DataStore::from_level_data(data);
    let to = cli.to.or(config.song_length).unwrap_or(60.0);
    if config.song_length.is_none() {
        config.song_length = Some(to);
    }

    let mut bridge = config.spectrum_enabled.then(|| SpectrumBridge::spawn(&config));
    let bins = config.spectrum_bins;

    let mut level = LevelContext::new(
        store,
        config,
        LoggingVisuals::default(),
        NullModifiers::default(),
    );
    if let Some(bridge) = &bridge {
        level.set_spectrum(bridge.reader());
    }
    level.init();

    let mut clock = WorldTime {
        elapsed: cli.from,
        ..Default::default()
    };
    let mut rng = fastrand::Rng::with_seed(level.config().seed);
    while clock.elapsed <= to {
        if let Some(bridge) = &bridge {
            bridge.submit((0..bins).map(|_| rng.f32()).collect());
        }
        level.tick(&clock);
        if !level.events().is_empty() {
            report(&level);
        }
        clock.advance(cli.step);
    }

    for target in cli.seek.iter().copied() {
        clock.seek(target);
        level.tick(&clock);
        info!("seek to {:.2}", target);
        report(&level);
    }

    level.clear();
    info!("visuals still alive after clear: {}", level.visuals().live);
    if let Some(bridge) = bridge.as_mut() {
        bridge.shutdown();
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
