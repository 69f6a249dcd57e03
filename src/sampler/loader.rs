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

//! Clip loading and caching.
//!
//! Clips are decoded entirely into memory ahead of time so that resolving a clip on trigger is a
//! map lookup.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rayon::prelude::*;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info, warn};

use super::clip::{ClipError, ClipRef, ClipSource, LoadedClip};

/// Decodes clips from disk and keeps them in memory, resampled to the output rate.
pub struct ClipCache {
    /// Target sample rate for transcoding (matches audio output).
    target_sample_rate: u32,
    /// Relative clip references are resolved against this path.
    base_path: PathBuf,
    clips: RwLock<HashMap<ClipRef, Arc<LoadedClip>>>,
}

impl ClipCache {
    /// Creates a new, empty clip cache.
    pub fn new(target_sample_rate: u32, base_path: &Path) -> ClipCache {
        ClipCache {
            target_sample_rate,
            base_path: base_path.to_path_buf(),
            clips: RwLock::new(HashMap::new()),
        }
    }

    /// Decodes every clip that isn't already cached. Decoding runs in parallel. Clips that fail
    /// are returned with their error and stay unresolvable; the rest are cached.
    pub fn preload(&self, clips: &[ClipRef]) -> Vec<(ClipRef, ClipError)> {
        let pending: Vec<&ClipRef> = {
            let cached = self.clips.read();
            let mut seen = Vec::new();
            for clip in clips {
                if !cached.contains_key(clip) && !seen.contains(&clip) {
                    seen.push(clip);
                }
            }
            seen
        };

        info!(clips = pending.len(), "Preloading clips");
        let results: Vec<(ClipRef, Result<LoadedClip, ClipError>)> = pending
            .into_par_iter()
            .map(|clip| (clip.clone(), self.load(clip)))
            .collect();

        let mut failures = Vec::new();
        let mut cached = self.clips.write();
        for (clip, result) in results {
            match result {
                Ok(loaded) => {
                    cached.insert(clip, Arc::new(loaded));
                }
                Err(e) => {
                    warn!(clip = %clip, err = %e, "Unable to load clip");
                    failures.push((clip, e));
                }
            }
        }
        failures
    }

    /// Inserts an already decoded clip.
    pub fn insert(&self, clip: ClipRef, loaded: LoadedClip) {
        self.clips.write().insert(clip, Arc::new(loaded));
    }

    /// Returns true if the clip is cached.
    pub fn contains(&self, clip: &ClipRef) -> bool {
        self.clips.read().contains_key(clip)
    }

    /// Returns the total memory used by cached clips.
    pub fn total_memory_usage(&self) -> usize {
        self.clips.read().values().map(|c| c.memory_size()).sum()
    }

    /// The file a clip reference points at.
    pub fn path_for(&self, clip: &ClipRef) -> PathBuf {
        let path = Path::new(clip.as_str());
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    fn load(&self, clip: &ClipRef) -> Result<LoadedClip, ClipError> {
        let path = self.path_for(clip);
        debug!(path = ?path, "Decoding clip");
        let (samples, channels, source_rate) = decode_file(&path)?;

        let samples = if source_rate != self.target_sample_rate {
            debug!(
                source_rate,
                target_rate = self.target_sample_rate,
                "Transcoding clip"
            );
            transcode(&samples, channels, source_rate, self.target_sample_rate)
        } else {
            samples
        };

        let loaded = LoadedClip::new(samples, channels, self.target_sample_rate);
        info!(
            path = ?path,
            channels,
            duration_ms = loaded.duration().as_millis(),
            memory_kb = loaded.memory_size() / 1024,
            "Clip loaded"
        );
        Ok(loaded)
    }
}

impl ClipSource for ClipCache {
    fn resolve(&self, clip: &ClipRef) -> Result<Arc<LoadedClip>, ClipError> {
        self.clips
            .read()
            .get(clip)
            .cloned()
            .ok_or_else(|| ClipError::NotLoaded(clip.clone()))
    }
}

impl std::fmt::Debug for ClipCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipCache")
            .field("cached_clips", &self.clips.read().len())
            .field("target_sample_rate", &self.target_sample_rate)
            .field("total_memory_kb", &(self.total_memory_usage() / 1024))
            .finish()
    }
}

/// Decodes a whole file into interleaved f32 samples.
fn decode_file(path: &Path) -> Result<(Vec<f32>, u16, u32), ClipError> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|source| ClipError::Io {
        path: display.clone(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let decode_err = |source| ClipError::Decode {
        path: display.clone(),
        source,
    };

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(decode_err)?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| ClipError::NoAudioTrack(display.clone()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| ClipError::UnknownSampleRate(display.clone()))?;
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(decode_err)?;

    let mut samples = Vec::new();
    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(decode_err(e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(path = %path.display(), err = %e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(decode_err(e)),
        };

        let spec = *decoded.spec();
        if channels == 0 {
            channels = spec.channels.count() as u16;
        }
        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buf.samples());
    }

    Ok((samples, channels.max(1), sample_rate))
}

/// Transcodes samples from one sample rate to another using linear interpolation.
/// Linear interpolation is sufficient for the short one-shots and loops pads play.
fn transcode(samples: &[f32], channel_count: u16, source_rate: u32, target_rate: u32) -> Vec<f32> {
    let channels = channel_count.max(1) as usize;
    if source_rate == 0 || target_rate == 0 {
        return samples.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let source_frames = samples.len() / channels;
    let target_frames = (source_frames as f64 * ratio).ceil() as usize;

    let mut output = Vec::with_capacity(target_frames * channels);
    for target_frame in 0..target_frames {
        let source_pos = target_frame as f64 / ratio;
        let source_frame = source_pos.floor() as usize;
        let frac = source_pos.fract() as f32;

        for channel in 0..channels {
            let s0 = samples
                .get(source_frame * channels + channel)
                .copied()
                .unwrap_or(0.0);
            let s1 = samples
                .get((source_frame + 1) * channels + channel)
                .copied()
                .unwrap_or(s0);
            output.push(s0 + (s1 - s0) * frac);
        }
    }
    output
}
