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

use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;
use crate::sampler::{EngineOptions, EqSettings, MixSettings};

const DEFAULT_MAX_VOICES: usize = 64;
const DEFAULT_FADE_OUT: Duration = Duration::from_millis(10);
const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(50);

fn parse_duration(
    field: &'static str,
    value: &Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => Ok(DurationString::from_string(value.clone())
            .map_err(|_| ConfigError::InvalidDuration {
                field,
                value: value.clone(),
            })?
            .into()),
        None => Ok(default),
    }
}

/// Engine policy: voice limits, fades and progress reporting.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct EngineConfig {
    /// Maximum concurrent voices across all pads (default: 64).
    max_voices: Option<usize>,

    /// Fade applied when a voice is stopped, e.g. "10ms". Clamped to 50ms; "0ms" is abrupt.
    fade_out: Option<String>,

    /// Whether unmute pads loop their clip (default: true).
    unmute_loops: Option<bool>,

    /// How often progress events are published (default: 50ms).
    progress_interval: Option<String>,
}

impl EngineConfig {
    pub fn max_voices(&self) -> usize {
        self.max_voices.unwrap_or(DEFAULT_MAX_VOICES)
    }

    pub fn fade_out(&self) -> Result<Duration, ConfigError> {
        parse_duration("fade_out", &self.fade_out, DEFAULT_FADE_OUT)
    }

    pub fn unmute_loops(&self) -> bool {
        self.unmute_loops.unwrap_or(true)
    }

    pub fn progress_interval(&self) -> Result<Duration, ConfigError> {
        let interval = parse_duration(
            "progress_interval",
            &self.progress_interval,
            DEFAULT_PROGRESS_INTERVAL,
        )?;
        if interval.is_zero() {
            return Err(ConfigError::InvalidDuration {
                field: "progress_interval",
                value: "0".to_string(),
            });
        }
        Ok(interval)
    }

    /// Builds engine options for the given output sample rate.
    pub fn options(&self, sample_rate: u32) -> Result<EngineOptions, ConfigError> {
        Ok(EngineOptions::new(
            sample_rate,
            self.max_voices(),
            self.fade_out()?,
            self.unmute_loops(),
        ))
    }
}

/// The initial state of the mix bus.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct MixConfig {
    /// Master volume between 0 and 1 (default: 1).
    master_volume: Option<f32>,

    /// Whether the bus starts muted (default: false).
    muted: Option<bool>,

    /// Three band EQ gains in dB.
    #[serde(default)]
    eq: EqSettings,
}

impl MixConfig {
    pub fn master_volume(&self) -> f32 {
        self.master_volume.unwrap_or(1.0)
    }

    pub fn settings(&self) -> MixSettings {
        MixSettings::new(
            self.master_volume(),
            self.muted.unwrap_or(false),
            self.eq.clamped(),
        )
    }
}

#[cfg(test)]
mod test {
    use config::{Config, File, FileFormat};

    use super::*;

    fn engine(yaml: &str) -> EngineConfig {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        let options = config.options(48000).unwrap();
        assert_eq!(options.sample_rate(), 48000);
        assert_eq!(options.max_voices(), 64);
        assert_eq!(options.fade_out(), Duration::from_millis(10));
        assert!(options.unmute_loops());
        assert_eq!(
            config.progress_interval().unwrap(),
            Duration::from_millis(50)
        );
    }

    #[test]
    fn parses_durations() {
        let config = engine(
            r#"
            max_voices: 8
            fade_out: 20ms
            unmute_loops: false
            progress_interval: 100ms
            "#,
        );
        let options = config.options(44100).unwrap();
        assert_eq!(options.max_voices(), 8);
        assert_eq!(options.fade_out(), Duration::from_millis(20));
        assert!(!options.unmute_loops());
        assert_eq!(
            config.progress_interval().unwrap(),
            Duration::from_millis(100)
        );
    }

    #[test]
    fn clamps_long_fades() {
        let config = engine("fade_out: 2s");
        let options = config.options(44100).unwrap();
        assert_eq!(options.fade_out(), Duration::from_millis(50));
    }

    #[test]
    fn rejects_bad_durations() {
        let config = engine("fade_out: soon");
        assert!(matches!(
            config.options(44100),
            Err(ConfigError::InvalidDuration {
                field: "fade_out",
                ..
            })
        ));
        let config = engine("progress_interval: 0ms");
        assert!(config.progress_interval().is_err());
    }

    #[test]
    fn mix_settings() {
        let mix: MixConfig = Config::builder()
            .add_source(File::from_str(
                "master_volume: 0.5\nmuted: true\neq:\n  low: 30.0\n  high: -3.0\n",
                FileFormat::Yaml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        let settings = mix.settings();
        assert_eq!(settings.master_volume(), 0.5);
        assert!(settings.muted());
        assert_eq!(settings.eq(), EqSettings::new(12.0, 0.0, -3.0));
    }
}
