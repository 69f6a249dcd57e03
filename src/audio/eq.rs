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

//! The bus EQ: a low shelf, a mid bell and a high shelf built from state variable filters.

use std::f64::consts::PI;

use crate::sampler::EqSettings;

/// Corner of the low shelf.
pub const LOW_SHELF_HZ: f32 = 320.0;
/// Centre of the mid bell.
pub const MID_BELL_HZ: f32 = 1000.0;
/// Corner of the high shelf.
pub const HIGH_SHELF_HZ: f32 = 3200.0;

const SHELF_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;
const BELL_Q: f32 = 0.5;

#[derive(Debug, thiserror::Error)]
pub enum EqError {
    #[error("invalid filter sample rate {0}")]
    SampleRate(u32),

    #[error("filter frequency {frequency}Hz is above nyquist for {sample_rate}Hz")]
    AboveNyquist { frequency: f32, sample_rate: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    Bell,
    LowShelf,
    HighShelf,
}

/// Coefficients for one band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    a1: f64,
    a2: f64,
    a3: f64,
    m0: f64,
    m1: f64,
    m2: f64,
}

impl BiquadCoefficients {
    fn new(
        band: Band,
        sample_rate: u32,
        frequency: f32,
        q: f32,
        gain_db: f32,
    ) -> Result<BiquadCoefficients, EqError> {
        if sample_rate == 0 {
            return Err(EqError::SampleRate(sample_rate));
        }
        if frequency >= sample_rate as f32 / 2.0 {
            return Err(EqError::AboveNyquist {
                frequency,
                sample_rate,
            });
        }

        let a = f64::powf(10.0, gain_db as f64 / 40.0);
        let w = f64::tan(PI * frequency as f64 / sample_rate as f64);
        let (g, k, m0, m1, m2) = match band {
            Band::Bell => {
                let k = 1.0 / (q as f64 * a);
                (w, k, 1.0, k * (a * a - 1.0), 0.0)
            }
            Band::LowShelf => {
                let k = 1.0 / q as f64;
                (w / a.sqrt(), k, 1.0, k * (a - 1.0), a * a - 1.0)
            }
            Band::HighShelf => {
                let k = 1.0 / q as f64;
                (w * a.sqrt(), k, a * a, k * (1.0 - a) * a, 1.0 - a * a)
            }
        };

        let a1 = 1.0 / (1.0 + g * (g + k));
        let a2 = g * a1;
        let a3 = g * a2;
        Ok(BiquadCoefficients {
            a1,
            a2,
            a3,
            m0,
            m1,
            m2,
        })
    }
}

/// State variable biquad filter, designed by Andrew Simper of Cytomic.
/// See <http://cytomic.com/files/dsp/SvfLinearTrapOptimised2.pdf>
#[derive(Debug, Default, Clone)]
pub struct BiquadFilter {
    ic1eq: f64,
    ic2eq: f64,
}

impl BiquadFilter {
    /// Apply the filter on a single sample.
    #[inline]
    pub fn process_sample(&mut self, coefficients: &BiquadCoefficients, input: f64) -> f64 {
        let v0 = input;
        let v3 = v0 - self.ic2eq;
        let v1 = coefficients.a1 * self.ic1eq + coefficients.a2 * v3;
        let v2 = self.ic2eq + coefficients.a2 * self.ic1eq + coefficients.a3 * v3;
        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;
        coefficients.m0 * v0 + coefficients.m1 * v1 + coefficients.m2 * v2
    }

    #[inline]
    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}

/// Coefficients for all three bands at one sample rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThreeBandCoefficients {
    settings: EqSettings,
    low: BiquadCoefficients,
    mid: BiquadCoefficients,
    high: BiquadCoefficients,
}

impl ThreeBandCoefficients {
    /// Computes coefficients for the given gains. Band frequencies are pulled below nyquist for
    /// low sample rates.
    pub fn new(settings: &EqSettings, sample_rate: u32) -> Result<ThreeBandCoefficients, EqError> {
        let limit = sample_rate as f32 * 0.45;
        Ok(ThreeBandCoefficients {
            settings: *settings,
            low: BiquadCoefficients::new(
                Band::LowShelf,
                sample_rate,
                LOW_SHELF_HZ.min(limit),
                SHELF_Q,
                settings.low(),
            )?,
            mid: BiquadCoefficients::new(
                Band::Bell,
                sample_rate,
                MID_BELL_HZ.min(limit),
                BELL_Q,
                settings.mid(),
            )?,
            high: BiquadCoefficients::new(
                Band::HighShelf,
                sample_rate,
                HIGH_SHELF_HZ.min(limit),
                SHELF_Q,
                settings.high(),
            )?,
        })
    }

    /// The settings these coefficients were computed for.
    pub fn settings(&self) -> &EqSettings {
        &self.settings
    }
}

/// Filter state for one channel of one voice.
#[derive(Debug, Default, Clone)]
pub struct ThreeBandFilter {
    low: BiquadFilter,
    mid: BiquadFilter,
    high: BiquadFilter,
}

impl ThreeBandFilter {
    #[inline]
    pub fn process_sample(&mut self, coefficients: &ThreeBandCoefficients, input: f32) -> f32 {
        let low = self.low.process_sample(&coefficients.low, input as f64);
        let mid = self.mid.process_sample(&coefficients.mid, low);
        self.high.process_sample(&coefficients.high, mid) as f32
    }

    pub fn reset(&mut self) {
        self.low.reset();
        self.mid.reset();
        self.high.reset();
    }
}
