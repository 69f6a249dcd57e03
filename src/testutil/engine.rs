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
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::audio::constant_clip;
use crate::config::{BankDefinition, PadDefinition};
use crate::sampler::{
    ClipCache, ClipRef, EngineOptions, MixSettings, SamplerEngine, TriggerMode,
};

/// A low rate keeps frame arithmetic readable in tests.
pub const TEST_SAMPLE_RATE: u32 = 1000;

/// Every fixture clip lasts one second.
pub const TEST_CLIP_FRAMES: usize = 1000;

/// A pad to register in a test engine: (bank, pad, mode, volume). The pad plays `<pad>.wav`.
pub type PadFixture<'a> = (&'a str, &'a str, TriggerMode, f32);

/// Engine options for tests: abrupt stops and looping unmute pads.
pub fn test_options() -> EngineOptions {
    EngineOptions::new(TEST_SAMPLE_RATE, 64, Duration::ZERO, true)
}

/// Builds an engine whose pads each play a one second mono clip of constant 0.5.
pub fn test_engine(options: EngineOptions, pads: &[PadFixture]) -> (SamplerEngine, Arc<ClipCache>) {
    let clips = Arc::new(ClipCache::new(options.sample_rate(), Path::new(".")));

    let mut banks: Vec<BankDefinition> = Vec::new();
    for (bank, pad, mode, volume) in pads {
        let clip = format!("{pad}.wav");
        clips.insert(
            ClipRef::new(clip.clone()),
            constant_clip(0.5, TEST_CLIP_FRAMES, 1, options.sample_rate()),
        );
        let definition = PadDefinition::new(pad, &clip, *mode, *volume);
        match banks.iter_mut().find(|b| b.id().as_str() == *bank) {
            Some(existing) => existing.push_pad(definition),
            None => banks.push(BankDefinition::new(bank, vec![definition])),
        }
    }

    let engine = SamplerEngine::new(options, clips.clone(), MixSettings::default());
    engine.load_banks(&banks);
    (engine, clips)
}
