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

//! Pad-triggered clip playback.
//!
//! This module provides:
//! - Clip loading and caching (in-memory for zero-latency triggers)
//! - The trigger-mode state machine and voice management
//! - A per-pad settings hot-swap queue
//! - The shared mix bus and progress reporting

mod clip;
mod engine;
mod error;
mod events;
mod hotswap;
mod loader;
mod mix;
mod monitor;
mod pad;
mod policy;
mod progress;
mod voice;

pub use clip::{ClipError, ClipRef, ClipSource, LoadedClip};
pub use engine::{EngineOptions, SamplerEngine, StopScope, TriggerOutcome, MAX_FADE_OUT};
pub use error::EngineError;
pub use events::{write_json_lines, EngineEvent, EventBus, StopReason};
pub use hotswap::SettingsQueue;
pub use loader::ClipCache;
pub use mix::{
    compute_effective_gain, display_percent, EffectiveMix, EqSettings, MixBus, MixChange,
    MixSettings, EQ_RANGE_DB,
};
pub use monitor::ProgressMonitor;
pub use pad::{BankId, PadId, PadSettings, TriggerMode};
pub use policy::{transition, Action, Intent};
pub use progress::ProgressSample;
pub use voice::{Voice, VoiceHandle, VoiceId, VoiceState, VoiceTable};
