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
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A reference to a clip, usually a file path relative to the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipRef(String);

impl ClipRef {
    pub fn new(reference: impl Into<String>) -> ClipRef {
        ClipRef(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClipRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised while resolving or decoding a clip.
#[derive(Debug, thiserror::Error)]
pub enum ClipError {
    #[error("clip {0} has not been loaded")]
    NotLoaded(ClipRef),

    #[error("unable to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: symphonia::core::errors::Error,
    },

    #[error("unable to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no audio track found in {0}")]
    NoAudioTrack(String),

    #[error("sample rate not specified in {0}")]
    UnknownSampleRate(String),
}

/// A fully decoded clip held in memory. The sample data is interleaved.
pub struct LoadedClip {
    data: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl LoadedClip {
    /// Creates a clip from interleaved samples. A channel count of zero is treated as mono.
    pub fn new(data: Vec<f32>, channels: u16, sample_rate: u32) -> LoadedClip {
        LoadedClip {
            data,
            channels: channels.max(1),
            sample_rate,
        }
    }

    /// The number of frames in the clip.
    pub fn frames(&self) -> u64 {
        (self.data.len() / self.channels as usize) as u64
    }

    /// Returns the sample for the given frame and channel, or silence past the end.
    #[inline]
    pub fn sample(&self, frame: u64, channel: usize) -> f32 {
        let index = frame as usize * self.channels as usize + channel;
        self.data.get(index).copied().unwrap_or(0.0)
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The playback length of the clip.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

impl fmt::Debug for LoadedClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedClip")
            .field("frames", &self.frames())
            .field("channels", &self.channels)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

/// Resolves clip references into decoded clips. Resolution is called while a trigger holds the
/// voice manager lock, so implementations must not block or perform I/O.
pub trait ClipSource: Send + Sync {
    fn resolve(&self, clip: &ClipRef) -> Result<Arc<LoadedClip>, ClipError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_and_duration() {
        let clip = LoadedClip::new(vec![0.0; 88200], 2, 44100);
        assert_eq!(clip.frames(), 44100);
        assert_eq!(clip.duration(), Duration::from_secs(1));
        assert_eq!(clip.memory_size(), 88200 * 4);
    }

    #[test]
    fn sample_past_end_is_silent() {
        let clip = LoadedClip::new(vec![0.25, -0.25], 2, 48000);
        assert_eq!(clip.sample(0, 0), 0.25);
        assert_eq!(clip.sample(0, 1), -0.25);
        assert_eq!(clip.sample(1, 0), 0.0);
    }

    #[test]
    fn zero_channels_is_mono() {
        let clip = LoadedClip::new(vec![1.0, 1.0, 1.0], 0, 48000);
        assert_eq!(clip.channels(), 1);
        assert_eq!(clip.frames(), 3);
    }
}
