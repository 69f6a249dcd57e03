// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{error::Error, fmt, sync::Arc, thread::JoinHandle};

use tracing::{debug, warn};

use crate::config;
use crate::playsync::CancelHandle;

pub mod cpal;
pub mod eq;
pub mod mixer;
pub mod mock;
pub mod thread_priority;

use mixer::AudioMixer;

/// An output device that pulls rendered audio from a mixer.
pub trait Device: fmt::Display + Send + Sync {
    /// The sample rate the device renders at. Clips are resampled to this rate at load time.
    fn sample_rate(&self) -> u32;

    /// The number of interleaved output channels.
    fn channels(&self) -> u16;

    /// Starts rendering the given mixer. Rendering continues until the returned stream is
    /// dropped or stopped.
    fn start(&self, mixer: AudioMixer) -> Result<OutputStream, Box<dyn Error>>;
}

/// A running output stream. Dropping it stops rendering and joins the backing threads.
pub struct OutputStream {
    cancel: CancelHandle,
    threads: Vec<JoinHandle<()>>,
}

impl OutputStream {
    pub(crate) fn new(cancel: CancelHandle, threads: Vec<JoinHandle<()>>) -> OutputStream {
        OutputStream { cancel, threads }
    }

    /// Returns true once the stream has been asked to stop.
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stops the stream and waits for its threads to exit.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        for thread in self.threads.drain(..) {
            if thread.join().is_err() {
                warn!("Output thread panicked");
            }
        }
        debug!("Output stream stopped");
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Gets the configured device. Names starting with "mock" get a headless device that renders
/// on a timer.
pub fn get_device(config: Option<&config::Audio>) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    let config = match config {
        Some(config) => config,
        None => return Err("there must be an audio device specified".into()),
    };

    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(config)));
    };

    Ok(Arc::new(cpal::Device::get(config)?))
}
