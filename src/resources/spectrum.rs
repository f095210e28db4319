//! Bridge between the main thread and the background spectrum worker.
//!
//! Use [`SpectrumBridge::spawn`] once during level setup to start the worker.
//! The audio side feeds raw spectrum frames with [`SpectrumBridge::submit`];
//! the worker aggregates them into low/mid/high band averages on its own
//! schedule and publishes the three scalars through relaxed atomics.
//!
//! The main thread reads a [`SpectrumSnapshot`] once per tick without taking
//! any lock. Reads may be one interval stale, and the three bands are not
//! guaranteed to come from the same frame; each band is consumed on its own.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Sender, unbounded};
use log::info;

use crate::resources::levelconfig::LevelConfig;
use crate::systems::spectrum::spectrum_thread;

/// Commands sent *to* the spectrum worker.
#[derive(Debug)]
pub enum SpectrumCmd {
    /// One frame of spectrum magnitudes, lowest frequency first.
    Samples(Vec<f32>),
    Shutdown,
}

/// Three independently published band averages.
#[derive(Debug, Default)]
pub struct SpectrumBands {
    low: AtomicU32,
    mid: AtomicU32,
    high: AtomicU32,
}

impl SpectrumBands {
    pub fn store(&self, low: f32, mid: f32, high: f32) {
        self.low.store(low.to_bits(), Ordering::Relaxed);
        self.mid.store(mid.to_bits(), Ordering::Relaxed);
        self.high.store(high.to_bits(), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SpectrumSnapshot {
        SpectrumSnapshot {
            low: f32::from_bits(self.low.load(Ordering::Relaxed)),
            mid: f32::from_bits(self.mid.load(Ordering::Relaxed)),
            high: f32::from_bits(self.high.load(Ordering::Relaxed)),
        }
    }
}

/// Band averages as read by the main thread for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpectrumSnapshot {
    pub low: f32,
    pub mid: f32,
    pub high: f32,
}

/// Read side of the bridge, cheap to clone.
#[derive(Clone, Debug)]
pub struct SpectrumReader {
    bands: Arc<SpectrumBands>,
}

impl SpectrumReader {
    pub fn snapshot(&self) -> SpectrumSnapshot {
        self.bands.snapshot()
    }
}

/// Owner of the worker thread.
#[derive(Debug)]
pub struct SpectrumBridge {
    /// Sender for [`SpectrumCmd`] messages (main -> worker).
    tx_cmd: Sender<SpectrumCmd>,
    bands: Arc<SpectrumBands>,
    /// Join handle for the worker; `None` once shut down.
    handle: Option<JoinHandle<()>>,
}

impl SpectrumBridge {
    /// Spawn the worker thread.
    pub fn spawn(config: &LevelConfig) -> Self {
        let (tx_cmd, rx_cmd) = unbounded::<SpectrumCmd>();
        let bands = Arc::new(SpectrumBands::default());
        let worker_bands = Arc::clone(&bands);
        let interval = Duration::from_millis(config.spectrum_interval_ms.max(1));

        let handle = std::thread::spawn(move || spectrum_thread(rx_cmd, worker_bands, interval));

        SpectrumBridge {
            tx_cmd,
            bands,
            handle: Some(handle),
        }
    }

    /// Hand a frame to the worker. Dropped silently after shutdown.
    pub fn submit(&self, samples: Vec<f32>) {
        let _ = self.tx_cmd.send(SpectrumCmd::Samples(samples));
    }

    pub fn reader(&self) -> SpectrumReader {
        SpectrumReader {
            bands: Arc::clone(&self.bands),
        }
    }

    pub fn snapshot(&self) -> SpectrumSnapshot {
        self.bands.snapshot()
    }

    /// Gracefully request shutdown of the worker and join it.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.tx_cmd.send(SpectrumCmd::Shutdown);
            let _ = handle.join();
            info!(target: "spectrum", "worker joined");
        }
    }
}

impl Drop for SpectrumBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_round_trip_through_atomics() {
        let bands = SpectrumBands::default();
        assert_eq!(bands.snapshot(), SpectrumSnapshot::default());
        bands.store(0.25, 0.5, 0.75);
        let snap = bands.snapshot();
        assert_eq!(snap.low, 0.25);
        assert_eq!(snap.mid, 0.5);
        assert_eq!(snap.high, 0.75);
    }

    #[test]
    fn worker_publishes_submitted_frame() {
        let cfg = LevelConfig {
            spectrum_interval_ms: 1,
            ..LevelConfig::new()
        };
        let mut bridge = SpectrumBridge::spawn(&cfg);
        let reader = bridge.reader();
        bridge.submit(vec![3.0, 3.0, 6.0, 6.0, 9.0, 9.0]);

        let mut snap = reader.snapshot();
        for _ in 0..500 {
            if snap.high > 0.0 {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
            snap = reader.snapshot();
        }
        bridge.shutdown();
        assert_eq!(snap.low, 3.0);
        assert_eq!(snap.mid, 6.0);
        assert_eq!(snap.high, 9.0);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let mut bridge = SpectrumBridge::spawn(&LevelConfig::new());
        bridge.shutdown();
        bridge.shutdown();
        bridge.submit(vec![1.0]);
    }
}
