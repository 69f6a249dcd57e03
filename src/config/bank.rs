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
use serde::Deserialize;

use crate::sampler::{BankId, ClipRef, PadId, PadSettings, TriggerMode};

/// A YAML representation of a pad.
#[derive(Deserialize, Clone, Debug)]
pub struct PadDefinition {
    id: PadId,

    /// Display name. Defaults to the id.
    name: Option<String>,

    /// The clip to play, relative to the config file.
    clip: String,

    #[serde(default)]
    trigger_mode: TriggerMode,

    /// Pad volume between 0 and 1 (default: 1).
    volume: Option<f32>,

    color: Option<String>,

    shortcut_key: Option<String>,
}

impl PadDefinition {
    pub fn new(id: &str, clip: &str, trigger_mode: TriggerMode, volume: f32) -> PadDefinition {
        PadDefinition {
            id: PadId::new(id),
            name: None,
            clip: clip.to_string(),
            trigger_mode,
            volume: Some(volume),
            color: None,
            shortcut_key: None,
        }
    }

    pub fn with_shortcut_key(mut self, key: &str) -> PadDefinition {
        self.shortcut_key = Some(key.to_string());
        self
    }

    pub fn id(&self) -> &PadId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }

    pub fn clip(&self) -> ClipRef {
        ClipRef::new(self.clip.clone())
    }

    pub fn trigger_mode(&self) -> TriggerMode {
        self.trigger_mode
    }

    /// The configured volume, unclamped so validation can reject it.
    pub fn volume(&self) -> f32 {
        self.volume.unwrap_or(1.0)
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn shortcut_key(&self) -> Option<&str> {
        self.shortcut_key.as_deref()
    }

    /// The settings a voice of this pad starts with.
    pub fn settings(&self) -> PadSettings {
        PadSettings::new(self.clip(), self.trigger_mode, self.volume())
    }
}

/// A YAML representation of a bank of pads.
#[derive(Deserialize, Clone, Debug)]
pub struct BankDefinition {
    id: BankId,

    name: Option<String>,

    /// Color for pads that don't set their own.
    default_color: Option<String>,

    shortcut_key: Option<String>,

    #[serde(default)]
    pads: Vec<PadDefinition>,
}

impl BankDefinition {
    pub fn new(id: &str, pads: Vec<PadDefinition>) -> BankDefinition {
        BankDefinition {
            id: BankId::new(id),
            name: None,
            default_color: None,
            shortcut_key: None,
            pads,
        }
    }

    pub fn with_shortcut_key(mut self, key: &str) -> BankDefinition {
        self.shortcut_key = Some(key.to_string());
        self
    }

    pub fn id(&self) -> &BankId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }

    pub fn shortcut_key(&self) -> Option<&str> {
        self.shortcut_key.as_deref()
    }

    pub fn pads(&self) -> &[PadDefinition] {
        &self.pads
    }

    pub fn push_pad(&mut self, pad: PadDefinition) {
        self.pads.push(pad);
    }

    /// The color shown for a pad: its own, or the bank default.
    pub fn color_for<'a>(&'a self, pad: &'a PadDefinition) -> Option<&'a str> {
        pad.color().or(self.default_color.as_deref())
    }
}
