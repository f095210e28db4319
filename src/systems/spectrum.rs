//! Spectrum worker thread.
//!
//! [`spectrum_thread`] runs on its own OS thread, owns nothing but the most
//! recent spectrum frame, and publishes band averages into the shared
//! [`SpectrumBands`]. It never touches level state. See
//! [`crate::resources::spectrum`] for the bridge that spawns and joins it.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, TryRecvError};
use log::{debug, info};

use crate::resources::spectrum::{SpectrumBands, SpectrumCmd};

/// Average of the lowest, middle and highest thirds of a frame.
///
/// Frames with fewer than three bins put what they have in the low band.
pub fn band_averages(frame: &[f32]) -> (f32, f32, f32) {
    fn mean(bins: &[f32]) -> f32 {
        if bins.is_empty() {
            0.0
        } else {
            bins.iter().sum::<f32>() / bins.len() as f32
        }
    }
    if frame.len() < 3 {
        return (mean(frame), 0.0, 0.0);
    }
    let third = frame.len() / 3;
    let (low, rest) = frame.split_at(third);
    let (mid, high) = rest.split_at(third);
    (mean(low), mean(mid), mean(high))
}

/// Entry point of the spectrum worker.
///
/// Each iteration non-blockingly drains commands, keeping only the newest
/// frame, publishes its band averages, then sleeps for `interval`. Exits on
/// [`SpectrumCmd::Shutdown`] or when the bridge is dropped.
pub fn spectrum_thread(
    rx_cmd: Receiver<SpectrumCmd>,
    bands: Arc<SpectrumBands>,
    interval: Duration,
) {
    info!(
        target: "spectrum",
        "thread starting (id={:?})",
        std::thread::current().id()
    );

    let mut latest: Option<Vec<f32>> = None;

    'run: loop {
        // 1) Drain commands, newest frame wins
        loop {
            match rx_cmd.try_recv() {
                Ok(SpectrumCmd::Samples(frame)) => latest = Some(frame),
                Ok(SpectrumCmd::Shutdown) => {
                    debug!(target: "spectrum", "shutdown requested");
                    break 'run;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break 'run,
            }
        }

        // 2) Publish
        if let Some(frame) = latest.take() {
            let (low, mid, high) = band_averages(&frame);
            bands.store(low, mid, high);
        }

        std::thread::sleep(interval);
    } // 'run

    info!(
        target: "spectrum",
        "thread exiting (id={:?})",
        std::thread::current().id()
    );
}
