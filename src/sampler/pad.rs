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

use serde::{Deserialize, Serialize};

use super::clip::ClipRef;

/// The stable identifier of a pad.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PadId(String);

impl PadId {
    pub fn new(id: impl Into<String>) -> PadId {
        PadId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PadId {
    fn from(value: &str) -> Self {
        PadId::new(value)
    }
}

/// The stable identifier of a bank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BankId(String);

impl BankId {
    pub fn new(id: impl Into<String>) -> BankId {
        BankId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BankId {
    fn from(value: &str) -> Self {
        BankId::new(value)
    }
}

/// How presses and releases of a pad map onto its voices.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// A press starts the clip, the next press stops it.
    #[default]
    Toggle,
    /// The clip plays while the pad is held.
    Hold,
    /// Every press starts a new, overlapping voice.
    Stutter,
    /// A single persistent voice whose audibility flips with each press.
    Unmute,
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TriggerMode::Toggle => "toggle",
            TriggerMode::Hold => "hold",
            TriggerMode::Stutter => "stutter",
            TriggerMode::Unmute => "unmute",
        })
    }
}

/// An immutable snapshot of the settings a voice plays with. Edits build a new snapshot; a
/// snapshot is never changed once shared.
#[derive(Debug, Clone, PartialEq)]
pub struct PadSettings {
    clip: ClipRef,
    trigger_mode: TriggerMode,
    volume: f32,
}

impl PadSettings {
    /// Creates new settings. The volume is clamped to [0, 1] and NaN is treated as silence.
    pub fn new(clip: ClipRef, trigger_mode: TriggerMode, volume: f32) -> PadSettings {
        PadSettings {
            clip,
            trigger_mode,
            volume: clamp_unit(volume),
        }
    }

    /// Returns a copy of these settings with a different volume.
    pub fn with_volume(&self, volume: f32) -> PadSettings {
        PadSettings::new(self.clip.clone(), self.trigger_mode, volume)
    }

    /// Returns a copy of these settings with a different trigger mode.
    pub fn with_trigger_mode(&self, trigger_mode: TriggerMode) -> PadSettings {
        PadSettings::new(self.clip.clone(), trigger_mode, self.volume)
    }

    pub fn clip(&self) -> &ClipRef {
        &self.clip
    }

    pub fn trigger_mode(&self) -> TriggerMode {
        self.trigger_mode
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}

/// Clamps a linear gain into [0, 1].
pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
