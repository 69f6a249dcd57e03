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
use std::{
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicU32, AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use tracing::{info, span, Level};

use super::mixer::AudioMixer;
use super::OutputStream;
use crate::{config, playsync::CancelHandle};

/// A mock device. Renders the mixer on a timer thread and throws the audio away.
#[derive(Clone)]
pub struct Device {
    name: String,
    sample_rate: u32,
    channels: u16,
    buffer_size: usize,
    frames_rendered: Arc<AtomicU64>,
    /// The loudest absolute sample seen so far, stored as f32 bits.
    peak: Arc<AtomicU32>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(config: &config::Audio) -> Device {
        Device {
            name: config.device().to_string(),
            sample_rate: config.sample_rate(),
            channels: config.channels(),
            buffer_size: config.buffer_size(),
            frames_rendered: Arc::new(AtomicU64::new(0)),
            peak: Arc::new(AtomicU32::new(0)),
        }
    }

    /// The number of frames rendered since the device was created.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Relaxed)
    }

    /// The peak absolute sample value rendered so far.
    pub fn peak(&self) -> f32 {
        f32::from_bits(self.peak.load(Ordering::Relaxed))
    }
}

impl crate::audio::Device for Device {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn start(&self, mut mixer: AudioMixer) -> Result<OutputStream, Box<dyn Error>> {
        let cancel = CancelHandle::new();
        let buffer_size = self.buffer_size.max(1);
        let period =
            Duration::from_secs_f64(buffer_size as f64 / f64::from(self.sample_rate.max(1)));
        info!(
            device = self.name,
            sample_rate = self.sample_rate,
            channels = self.channels,
            buffer_size,
            "Starting mock output."
        );

        let thread = {
            let cancel = cancel.clone();
            let frames_rendered = self.frames_rendered.clone();
            let peak = self.peak.clone();
            let mut buffer = vec![0.0f32; buffer_size * mixer.num_channels() as usize];
            thread::Builder::new()
                .name("mock-output".to_string())
                .spawn(move || {
                    let span = span!(Level::INFO, "mock output");
                    let _enter = span.enter();

                    while !cancel.is_cancelled() {
                        mixer.process_into_output(&mut buffer);
                        let loudest = buffer.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
                        peak.fetch_max(loudest.to_bits(), Ordering::Relaxed);
                        frames_rendered.fetch_add(buffer_size as u64, Ordering::Relaxed);

                        if cancel.wait_timeout(period) {
                            break;
                        }
                    }
                })?
        };

        Ok(OutputStream::new(cancel, vec![thread]))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}
