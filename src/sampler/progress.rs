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
use std::time::Duration;

use serde::Serialize;

use super::voice::Voice;

/// Where a voice is within its clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSample {
    /// 0 to 100. Only a voice that has played its whole clip reads 100.
    pub percent: u8,
    pub elapsed: Duration,
    pub remaining: Duration,
}

impl ProgressSample {
    pub fn is_complete(&self) -> bool {
        self.percent == 100
    }
}

/// Reads a voice's progress from its cursor. Looping voices report their position within the
/// current pass.
pub fn sample(voice: &Voice) -> ProgressSample {
    let clip = voice.clip();
    let frames = clip.frames();
    let cursor = voice.cursor();

    if frames == 0 {
        return ProgressSample {
            percent: 100,
            elapsed: Duration::ZERO,
            remaining: Duration::ZERO,
        };
    }

    let (position, complete) = if voice.is_looping() {
        (cursor % frames, false)
    } else {
        (cursor.min(frames), cursor >= frames)
    };

    let percent = if complete {
        100
    } else {
        // Floors, so anything short of the end stays below 100.
        ((position as u128 * 100) / frames as u128) as u8
    };

    ProgressSample {
        percent,
        elapsed: frames_to_duration(position, clip.sample_rate()),
        remaining: frames_to_duration(frames - position, clip.sample_rate()),
    }
}

fn frames_to_duration(frames: u64, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(frames as f64 / sample_rate as f64)
}
