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
use std::{error::Error, fs::File, path::PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::sampler::LoadedClip;

/// Writes a 32 bit float WAV file. `samples` holds one vector per channel; they are interleaved
/// on write.
pub fn write_wav(
    path: PathBuf,
    samples: Vec<Vec<f32>>,
    sample_rate: u32,
) -> Result<(), Box<dyn Error>> {
    let num_channels = samples.len();
    assert!(num_channels > 0, "At least one channel is required");
    assert!(num_channels <= u16::MAX.into(), "Too many channels!");

    let mut writer = WavWriter::new(
        File::create(path)?,
        WavSpec {
            channels: num_channels as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    )?;

    let frames = samples.iter().map(|channel| channel.len()).max().unwrap_or(0);
    for frame in 0..frames {
        for channel in samples.iter() {
            writer.write_sample(channel.get(frame).copied().unwrap_or(0.0))?;
        }
    }
    writer.finalize()?;

    Ok(())
}

/// An in-memory clip holding a constant value on every channel.
pub fn constant_clip(value: f32, frames: usize, channels: u16, sample_rate: u32) -> LoadedClip {
    LoadedClip::new(
        vec![value; frames * channels as usize],
        channels,
        sample_rate,
    )
}

/// Calculate RMS (Root Mean Square) of a signal
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|&x| x * x).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
