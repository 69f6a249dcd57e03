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

//! The shared mix bus.
//!
//! Master volume, global mute and the EQ live here behind a single mutation entry point. The
//! render path takes one copy of the settings per audio cycle.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::pad::clamp_unit;

/// The largest boost or cut, in dB, any EQ band accepts.
pub const EQ_RANGE_DB: f32 = 12.0;

/// Gains for the three EQ bands, in dB.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqSettings {
    #[serde(default)]
    low: f32,
    #[serde(default)]
    mid: f32,
    #[serde(default)]
    high: f32,
}

impl EqSettings {
    /// Creates new EQ settings. Each band is clamped to the supported range.
    pub fn new(low: f32, mid: f32, high: f32) -> EqSettings {
        EqSettings {
            low: clamp_db(low),
            mid: clamp_db(mid),
            high: clamp_db(high),
        }
    }

    pub fn low(&self) -> f32 {
        self.low
    }

    pub fn mid(&self) -> f32 {
        self.mid
    }

    pub fn high(&self) -> f32 {
        self.high
    }

    /// Returns true if no band is boosted or cut.
    pub fn is_flat(&self) -> bool {
        self.low == 0.0 && self.mid == 0.0 && self.high == 0.0
    }

    /// Re-applies the band limits. Used for values that bypassed the constructor, such as
    /// deserialized configuration.
    pub fn clamped(&self) -> EqSettings {
        EqSettings::new(self.low, self.mid, self.high)
    }
}

fn clamp_db(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-EQ_RANGE_DB, EQ_RANGE_DB)
    }
}

/// The global mix state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixSettings {
    master_volume: f32,
    muted: bool,
    eq: EqSettings,
}

impl Default for MixSettings {
    fn default() -> Self {
        MixSettings {
            master_volume: 1.0,
            muted: false,
            eq: EqSettings::default(),
        }
    }
}

impl MixSettings {
    pub fn new(master_volume: f32, muted: bool, eq: EqSettings) -> MixSettings {
        MixSettings {
            master_volume: clamp_unit(master_volume),
            muted,
            eq: eq.clamped(),
        }
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn eq(&self) -> EqSettings {
        self.eq
    }
}

/// A single change to the mix bus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MixChange {
    MasterVolume(f32),
    Muted(bool),
    ToggleMute,
    Eq(EqSettings),
}

/// The mix bus shared by the engine, the render path and any controllers.
#[derive(Debug, Default)]
pub struct MixBus {
    settings: RwLock<MixSettings>,
}

impl MixBus {
    pub fn new(settings: MixSettings) -> MixBus {
        MixBus {
            settings: RwLock::new(settings),
        }
    }

    /// Returns a consistent copy of the current settings.
    pub fn settings(&self) -> MixSettings {
        *self.settings.read()
    }

    /// Applies a change and returns the resulting settings.
    pub fn apply(&self, change: MixChange) -> MixSettings {
        let mut settings = self.settings.write();
        match change {
            MixChange::MasterVolume(volume) => settings.master_volume = clamp_unit(volume),
            MixChange::Muted(muted) => settings.muted = muted,
            MixChange::ToggleMute => settings.muted = !settings.muted,
            MixChange::Eq(eq) => settings.eq = eq.clamped(),
        }
        info!(
            master_volume = settings.master_volume,
            muted = settings.muted,
            low = settings.eq.low,
            mid = settings.eq.mid,
            high = settings.eq.high,
            "Mix bus updated"
        );
        *settings
    }
}

/// The gain and spectrum one voice is rendered with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveMix {
    pub gain: f32,
    pub eq: EqSettings,
}

/// Combines a pad's volume with the bus into the gain and EQ a voice is rendered with. Gain is
/// linear and clamped to [0, 1]; muting forces it to zero without touching either volume.
pub fn compute_effective_gain(
    pad_volume: f32,
    master_volume: f32,
    muted: bool,
    eq: EqSettings,
) -> EffectiveMix {
    let gain = if muted {
        0.0
    } else {
        clamp_unit(pad_volume * master_volume)
    };
    EffectiveMix { gain, eq }
}

/// The percentage shown for a gain. Uses the same linear value the audio path uses.
pub fn display_percent(gain: f32) -> u8 {
    (clamp_unit(gain) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_is_product_of_volumes() {
        let mix = compute_effective_gain(0.5, 0.8, false, EqSettings::default());
        assert!((mix.gain - 0.4).abs() < f32::EPSILON);
        assert_eq!(display_percent(mix.gain), 40);
    }

    #[test]
    fn gain_is_clamped() {
        let mix = compute_effective_gain(2.0, 1.0, false, EqSettings::default());
        assert_eq!(mix.gain, 1.0);
        let mix = compute_effective_gain(f32::NAN, 1.0, false, EqSettings::default());
        assert_eq!(mix.gain, 0.0);
    }

    #[test]
    fn mute_is_non_destructive() {
        let bus = MixBus::new(MixSettings::new(0.7, false, EqSettings::default()));
        bus.apply(MixChange::Muted(true));

        let settings = bus.settings();
        let mix = compute_effective_gain(0.5, settings.master_volume(), settings.muted(), settings.eq());
        assert_eq!(mix.gain, 0.0);
        assert_eq!(settings.master_volume(), 0.7);

        let settings = bus.apply(MixChange::ToggleMute);
        assert!(!settings.muted());
        let mix = compute_effective_gain(0.5, settings.master_volume(), settings.muted(), settings.eq());
        assert!((mix.gain - 0.35).abs() < 1e-6);
    }

    #[test]
    fn eq_bands_are_clamped() {
        let eq = EqSettings::new(20.0, -30.0, 3.0);
        assert_eq!(eq.low(), 12.0);
        assert_eq!(eq.mid(), -12.0);
        assert_eq!(eq.high(), 3.0);
        assert!(!eq.is_flat());
        assert!(EqSettings::default().is_flat());
    }

    #[test]
    fn apply_clamps_master_volume() {
        let bus = MixBus::default();
        assert_eq!(bus.apply(MixChange::MasterVolume(1.4)).master_volume(), 1.0);
        assert_eq!(bus.apply(MixChange::MasterVolume(-1.0)).master_volume(), 0.0);

        let eq = bus.apply(MixChange::Eq(EqSettings::new(2.0, 0.0, -2.0))).eq();
        assert_eq!(eq, EqSettings::new(2.0, 0.0, -2.0));
    }
}
