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
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, File, FileFormat};
use serde::Deserialize;
use tracing::info;

use crate::controller::shortcuts::ShortcutMap;
use crate::sampler::ClipRef;

mod audio;
mod bank;
mod engine;
mod error;

pub use audio::Audio;
pub use bank::{BankDefinition, PadDefinition};
pub use engine::{EngineConfig, MixConfig};
pub use error::ConfigError;

/// The top level sampler configuration.
#[derive(Deserialize, Clone, Debug)]
pub struct SamplerConfig {
    /// The audio output. Required to start, optional to verify.
    audio: Option<Audio>,

    #[serde(default)]
    engine: EngineConfig,

    #[serde(default)]
    mix: MixConfig,

    #[serde(default)]
    banks: Vec<BankDefinition>,

    /// Clip paths are relative to this directory.
    #[serde(skip)]
    base_path: PathBuf,
}

impl SamplerConfig {
    /// Loads and validates a config file.
    pub fn load(path: &Path) -> Result<SamplerConfig, ConfigError> {
        let mut config: SamplerConfig = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;
        config.base_path = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.validate()?;
        info!(
            path = %path.display(),
            banks = config.banks.len(),
            "Config loaded"
        );
        Ok(config)
    }

    /// Parses and validates a YAML document. Clip paths resolve against base_path.
    pub fn from_yaml_str(yaml: &str, base_path: &Path) -> Result<SamplerConfig, ConfigError> {
        let mut config: SamplerConfig = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        config.base_path = base_path.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut banks = HashSet::new();
        let mut pads = HashSet::new();
        for bank in self.banks.iter() {
            if !banks.insert(bank.id()) {
                return Err(ConfigError::DuplicateBank(bank.id().to_string()));
            }
            for pad in bank.pads() {
                if !pads.insert(pad.id()) {
                    return Err(ConfigError::DuplicatePad {
                        bank: bank.id().to_string(),
                        pad: pad.id().to_string(),
                    });
                }
                let volume = pad.volume();
                if !(0.0..=1.0).contains(&volume) {
                    return Err(ConfigError::InvalidVolume {
                        pad: pad.id().to_string(),
                        volume,
                    });
                }
            }
        }

        let master = self.mix.master_volume();
        if !(0.0..=1.0).contains(&master) {
            return Err(ConfigError::InvalidMasterVolume(master));
        }

        self.engine.fade_out()?;
        self.engine.progress_interval()?;
        ShortcutMap::from_banks(&self.banks)?;
        Ok(())
    }

    pub fn audio(&self) -> Option<&Audio> {
        self.audio.as_ref()
    }

    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    pub fn mix(&self) -> &MixConfig {
        &self.mix
    }

    pub fn banks(&self) -> &[BankDefinition] {
        &self.banks
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// The shortcut map for the banks. Already validated on load.
    pub fn shortcuts(&self) -> Result<ShortcutMap, ConfigError> {
        Ok(ShortcutMap::from_banks(&self.banks)?)
    }

    /// Every distinct clip referenced by a pad, in declaration order.
    pub fn clip_refs(&self) -> Vec<ClipRef> {
        let mut seen = HashSet::new();
        self.banks
            .iter()
            .flat_map(|bank| bank.pads())
            .map(|pad| pad.clip())
            .filter(|clip| seen.insert(clip.clone()))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;
    use std::path::Path;
    use std::time::Duration;

    use super::*;
    use crate::controller::shortcuts::ShortcutError;
    use crate::sampler::TriggerMode;

    const FULL: &str = r##"
audio:
  device: mock
  sample_rate: 48000
  channels: 2
  buffer_size: 256
engine:
  max_voices: 16
  fade_out: 20ms
  unmute_loops: false
  progress_interval: 25ms
mix:
  master_volume: 0.8
  muted: false
  eq:
    low: 3.0
banks:
  - id: drums
    name: Drums
    default_color: "#ff6600"
    shortcut_key: "1"
    pads:
      - id: kick
        name: Kick
        clip: kick.wav
        trigger_mode: toggle
        volume: 0.8
        color: "#ff0000"
        shortcut_key: K
      - id: snare
        clip: snare.wav
        trigger_mode: stutter
  - id: fx
    pads:
      - id: drone
        clip: drone.wav
        trigger_mode: unmute
        shortcut_key: shift+m
      - id: riser
        clip: kick.wav
        trigger_mode: hold
"##;

    #[test]
    fn parses_full_config() -> Result<(), Box<dyn Error>> {
        let config = SamplerConfig::from_yaml_str(FULL, Path::new("/clips"))?;

        let audio = config.audio().ok_or("missing audio")?;
        assert_eq!(audio.device(), "mock");
        assert_eq!(audio.sample_rate(), 48000);
        assert_eq!(audio.channels(), 2);
        assert_eq!(audio.buffer_size(), 256);

        let options = config.engine().options(audio.sample_rate())?;
        assert_eq!(options.max_voices(), 16);
        assert_eq!(options.fade_out(), Duration::from_millis(20));
        assert!(!options.unmute_loops());
        assert_eq!(
            config.engine().progress_interval()?,
            Duration::from_millis(25)
        );

        let mix = config.mix().settings();
        assert_eq!(mix.master_volume(), 0.8);
        assert_eq!(mix.eq().low(), 3.0);

        assert_eq!(config.banks().len(), 2);
        let drums = &config.banks()[0];
        assert_eq!(drums.name(), "Drums");
        let kick = &drums.pads()[0];
        assert_eq!(kick.name(), "Kick");
        assert_eq!(kick.settings().volume(), 0.8);
        assert_eq!(drums.color_for(kick), Some("#ff0000"));
        let snare = &drums.pads()[1];
        assert_eq!(snare.name(), "snare");
        assert_eq!(snare.trigger_mode(), TriggerMode::Stutter);
        assert_eq!(snare.volume(), 1.0);
        assert_eq!(drums.color_for(snare), Some("#ff6600"));
        assert_eq!(config.banks()[1].pads()[0].trigger_mode(), TriggerMode::Unmute);
        assert_eq!(config.banks()[1].pads()[1].trigger_mode(), TriggerMode::Hold);

        assert_eq!(config.shortcuts()?.len(), 3);
        assert_eq!(
            config.clip_refs(),
            vec![
                ClipRef::new("kick.wav"),
                ClipRef::new("snare.wav"),
                ClipRef::new("drone.wav"),
            ]
        );
        assert_eq!(config.base_path(), Path::new("/clips"));
        Ok(())
    }

    #[test]
    fn minimal_config() -> Result<(), Box<dyn Error>> {
        let config = SamplerConfig::from_yaml_str(
            "banks:\n  - id: a\n    pads:\n      - id: p\n        clip: p.wav\n",
            Path::new("."),
        )?;
        assert!(config.audio().is_none());
        assert_eq!(config.banks()[0].pads()[0].trigger_mode(), TriggerMode::Toggle);
        assert_eq!(config.mix().settings().master_volume(), 1.0);
        Ok(())
    }

    #[test]
    fn loads_from_file() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("sampler.yaml");
        std::fs::write(&path, FULL)?;
        let config = SamplerConfig::load(&path)?;
        assert_eq!(config.base_path(), dir.path());
        assert_eq!(config.banks().len(), 2);

        assert!(matches!(
            SamplerConfig::load(&dir.path().join("missing.yaml")),
            Err(ConfigError::Load(_))
        ));
        Ok(())
    }

    fn rejected(yaml: &str) -> ConfigError {
        match SamplerConfig::from_yaml_str(yaml, Path::new(".")) {
            Ok(_) => panic!("config should have been rejected"),
            Err(e) => e,
        }
    }

    #[test]
    fn rejects_duplicates() {
        assert!(matches!(
            rejected("banks:\n  - id: a\n  - id: a\n"),
            ConfigError::DuplicateBank(bank) if bank == "a"
        ));
        assert!(matches!(
            rejected(
                "banks:\n  - id: a\n    pads:\n      - id: p\n        clip: p.wav\n  - id: b\n    pads:\n      - id: p\n        clip: q.wav\n"
            ),
            ConfigError::DuplicatePad { bank, pad } if bank == "b" && pad == "p"
        ));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            rejected("banks:\n  - id: a\n    pads:\n      - id: p\n        clip: p.wav\n        volume: 1.5\n"),
            ConfigError::InvalidVolume { .. }
        ));
        assert!(matches!(
            rejected("mix:\n  master_volume: -0.1\n"),
            ConfigError::InvalidMasterVolume(_)
        ));
        assert!(matches!(
            rejected("engine:\n  fade_out: later\n"),
            ConfigError::InvalidDuration { .. }
        ));
        assert!(matches!(
            rejected("banks:\n  - id: a\n    pads:\n      - id: p\n        clip: p.wav\n        trigger_mode: latch\n"),
            ConfigError::Load(_)
        ));
    }

    #[test]
    fn rejects_bad_shortcuts() {
        assert!(matches!(
            rejected("banks:\n  - id: a\n    shortcut_key: m\n"),
            ConfigError::Shortcut(ShortcutError::Reserved { .. })
        ));
        assert!(matches!(
            rejected("banks:\n  - id: a\n    shortcut_key: k\n    pads:\n      - id: p\n        clip: p.wav\n        shortcut_key: K\n"),
            ConfigError::Shortcut(ShortcutError::Duplicate { .. })
        ));
    }
}
