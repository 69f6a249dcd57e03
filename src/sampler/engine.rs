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

//! The sampler engine coordinates triggers, the hot-swap queue, voices and the mix bus.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::clip::ClipSource;
use super::error::EngineError;
use super::events::{EngineEvent, EventBus, StopReason};
use super::hotswap::SettingsQueue;
use super::mix::{compute_effective_gain, EffectiveMix, MixBus, MixChange, MixSettings};
use super::pad::{BankId, PadId, PadSettings, TriggerMode};
use super::policy::{transition, Action, Intent};
use super::progress;
use super::voice::{Voice, VoiceHandle, VoiceManager, VoiceTable};
use crate::audio::mixer::AudioMixer;
use crate::config::BankDefinition;

/// The longest fade a stop may apply.
pub const MAX_FADE_OUT: Duration = Duration::from_millis(50);

const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_MAX_VOICES: usize = 64;
const DEFAULT_FADE_OUT: Duration = Duration::from_millis(10);

/// Engine policy.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    sample_rate: u32,
    max_voices: usize,
    fade_out: Duration,
    unmute_loops: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_voices: DEFAULT_MAX_VOICES,
            fade_out: DEFAULT_FADE_OUT,
            unmute_loops: true,
        }
    }
}

impl EngineOptions {
    /// Creates engine options. The fade is clamped to [`MAX_FADE_OUT`] and at least one voice is
    /// always allowed.
    pub fn new(
        sample_rate: u32,
        max_voices: usize,
        fade_out: Duration,
        unmute_loops: bool,
    ) -> EngineOptions {
        EngineOptions {
            sample_rate,
            max_voices: max_voices.max(1),
            fade_out: fade_out.min(MAX_FADE_OUT),
            unmute_loops,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn max_voices(&self) -> usize {
        self.max_voices
    }

    pub fn fade_out(&self) -> Duration {
        self.fade_out
    }

    pub fn unmute_loops(&self) -> bool {
        self.unmute_loops
    }

    /// The fade length in frames at the engine's sample rate.
    pub fn fade_frames(&self) -> u32 {
        (self.fade_out.as_secs_f64() * self.sample_rate as f64).round() as u32
    }
}

/// Which voices a stop-all sweeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopScope {
    Bank(BankId),
    Global,
}

impl fmt::Display for StopScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopScope::Bank(bank) => write!(f, "bank {bank}"),
            StopScope::Global => f.write_str("global"),
        }
    }
}

/// The result of a press or release.
#[derive(Debug, Clone)]
pub enum TriggerOutcome {
    /// A new voice was started.
    Started(VoiceHandle),
    /// This many voices were stopped.
    Stopped(usize),
    /// The pad's persistent voice was muted (true) or unmuted (false).
    Muted(bool),
    Ignored,
}

/// The sampler engine.
pub struct SamplerEngine {
    options: EngineOptions,
    clips: Arc<dyn ClipSource>,
    queue: SettingsQueue,
    /// Serializes every operation that creates or stops voices.
    voices: Mutex<VoiceManager>,
    bus: Arc<MixBus>,
    table: Arc<VoiceTable>,
    events: EventBus,
}

impl SamplerEngine {
    /// Creates a new engine with no pads.
    pub fn new(
        options: EngineOptions,
        clips: Arc<dyn ClipSource>,
        mix: MixSettings,
    ) -> SamplerEngine {
        let table = Arc::new(VoiceTable::new());
        SamplerEngine {
            voices: Mutex::new(VoiceManager::new(options.max_voices(), table.clone())),
            options,
            clips,
            queue: SettingsQueue::new(),
            bus: Arc::new(MixBus::new(mix)),
            table,
            events: EventBus::new(),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Replaces the bank layout. New pads are registered, pads that already exist get their new
    /// settings queued for their next voice, and pads that disappeared are stopped and removed.
    pub fn load_banks(&self, banks: &[BankDefinition]) {
        let mut voices = self.voices.lock();

        let mut present = HashSet::new();
        for bank in banks {
            for pad in bank.pads() {
                present.insert(pad.id().clone());
                self.queue
                    .register(pad.id().clone(), Arc::new(pad.settings()));
                voices.assign_bank(pad.id().clone(), bank.id().clone());
            }
        }

        let removed: Vec<PadId> = voices
            .pads()
            .filter(|pad| !present.contains(*pad))
            .cloned()
            .collect();
        for pad in removed.iter() {
            let taken = voices.take_pad(pad);
            self.retire(&mut voices, &taken, StopReason::StopAll);
            voices.forget_pad(pad);
            self.queue.unregister(pad);
        }
        voices.publish();

        info!(
            banks = banks.len(),
            pads = present.len(),
            removed = removed.len(),
            "Banks loaded"
        );
    }

    /// Registers a single pad, or queues new settings for it if it already exists.
    pub fn register_pad(&self, bank: BankId, pad: PadId, settings: PadSettings) {
        let mut voices = self.voices.lock();
        self.queue.register(pad.clone(), Arc::new(settings));
        debug!(pad = %pad, bank = %bank, "Pad registered");
        voices.assign_bank(pad, bank);
    }

    /// Moves a pad to another bank. Its live voices follow it.
    pub fn move_pad(&self, pad: &PadId, bank: BankId) -> Result<(), EngineError> {
        let mut voices = self.voices.lock();
        if !self.queue.contains(pad) {
            return Err(EngineError::InvalidPadReference(pad.clone()));
        }
        let previous = voices.assign_bank(pad.clone(), bank.clone());
        info!(pad = %pad, from = ?previous, to = %bank, "Pad moved");
        Ok(())
    }

    /// Presses a pad.
    pub fn trigger(&self, pad: &PadId) -> Result<TriggerOutcome, EngineError> {
        self.dispatch(pad, Intent::Press)
    }

    /// Releases a pad.
    pub fn stop_explicit(&self, pad: &PadId) -> Result<TriggerOutcome, EngineError> {
        self.dispatch(pad, Intent::Release)
    }

    /// Stops every live voice in scope and returns how many were stopped.
    pub fn stop_all(&self, scope: &StopScope) -> usize {
        let mut voices = self.voices.lock();
        self.reap(&mut voices);
        let taken = match scope {
            StopScope::Bank(bank) => voices.take_bank(bank),
            StopScope::Global => voices.take_all(),
        };
        let stopped = self.retire(&mut voices, &taken, StopReason::StopAll);
        voices.publish();
        info!(scope = %scope, voices = stopped, "Stop all");
        stopped
    }

    /// Queues new settings for a pad's next voice.
    pub fn queue_edit(&self, pad: &PadId, settings: PadSettings) -> Result<(), EngineError> {
        self.queue.queue_edit(pad, Arc::new(settings))?;
        debug!(pad = %pad, "Edit queued");
        Ok(())
    }

    /// The settings the pad's next voice would use.
    pub fn pending_settings(&self, pad: &PadId) -> Result<Arc<PadSettings>, EngineError> {
        self.queue.peek(pad)
    }

    /// The mix bus.
    pub fn mix(&self) -> &Arc<MixBus> {
        &self.bus
    }

    /// Applies a change to the mix bus.
    pub fn apply_mix(&self, change: MixChange) -> MixSettings {
        self.bus.apply(change)
    }

    /// The gain and EQ the pad's next voice would be rendered with right now.
    pub fn effective_mix(&self, pad: &PadId) -> Result<EffectiveMix, EngineError> {
        let settings = self.queue.peek(pad)?;
        let mix = self.bus.settings();
        Ok(compute_effective_gain(
            settings.volume(),
            mix.master_volume(),
            mix.muted(),
            mix.eq(),
        ))
    }

    /// Creates a render mixer bound to this engine's voices and mix bus.
    pub fn create_mixer(&self, channels: u16) -> AudioMixer {
        AudioMixer::new(
            self.table.clone(),
            self.bus.clone(),
            channels,
            self.options.sample_rate(),
        )
    }

    /// Subscribes to engine events.
    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Releases voices that reached their natural end and publishes progress for the rest.
    pub fn tick(&self) {
        let mut voices = self.voices.lock();
        let reaped = self.reap(&mut voices);
        if reaped == 0 && voices.prune_fading() {
            voices.publish();
        }
        for voice in voices.live() {
            let sample = progress::sample(voice);
            self.events.publish(EngineEvent::Progress {
                pad: voice.pad_id().clone(),
                voice: voice.id(),
                percent: sample.percent,
            });
        }
    }

    /// Returns true if the pad has a live voice.
    pub fn is_playing(&self, pad: &PadId) -> bool {
        self.voices.lock().live_count_for(pad) > 0
    }

    /// Returns the pad's live voices, oldest first.
    pub fn live_voices(&self, pad: &PadId) -> Vec<VoiceHandle> {
        self.voices
            .lock()
            .live_for(pad)
            .into_iter()
            .map(VoiceHandle::new)
            .collect()
    }

    /// Returns every live voice, oldest first.
    pub fn all_live_voices(&self) -> Vec<VoiceHandle> {
        self.voices
            .lock()
            .live()
            .iter()
            .cloned()
            .map(VoiceHandle::new)
            .collect()
    }

    /// Returns the number of live voices.
    pub fn active_voice_count(&self) -> usize {
        self.voices.lock().active_count()
    }

    fn dispatch(&self, pad: &PadId, intent: Intent) -> Result<TriggerOutcome, EngineError> {
        let mut voices = self.voices.lock();
        if !self.queue.contains(pad) {
            warn!(pad = %pad, "Trigger for unknown pad");
            return Err(EngineError::InvalidPadReference(pad.clone()));
        }
        self.reap(&mut voices);

        let live = voices.live_for(pad);
        // The newest voice decides, so a mode edit takes over once one voice runs under it.
        let mode = match live.last() {
            Some(voice) => voice.settings().trigger_mode(),
            None => self.queue.peek(pad)?.trigger_mode(),
        };

        let action = transition(mode, live.len(), intent);
        debug!(
            pad = %pad,
            mode = %mode,
            live = live.len(),
            ?intent,
            ?action,
            "Trigger"
        );

        match action {
            Action::Start => self.start_voice(&mut voices, pad),
            Action::Stop => {
                let taken = voices.take_pad(pad);
                let stopped = self.retire(&mut voices, &taken, StopReason::UserStop);
                voices.publish();
                Ok(TriggerOutcome::Stopped(stopped))
            }
            Action::ToggleMute => {
                let mut muted = false;
                for voice in live.iter() {
                    muted = voice.toggle_muted();
                    self.events.publish(EngineEvent::MuteChanged {
                        pad: pad.clone(),
                        voice: voice.id(),
                        muted,
                    });
                }
                Ok(TriggerOutcome::Muted(muted))
            }
            Action::Ignore => Ok(TriggerOutcome::Ignored),
        }
    }

    fn start_voice(
        &self,
        voices: &mut VoiceManager,
        pad: &PadId,
    ) -> Result<TriggerOutcome, EngineError> {
        let committed = self.queue.try_commit(pad, |settings| {
            self.clips
                .resolve(settings.clip())
                .map_err(|source| EngineError::AssetUnavailable {
                    pad: pad.clone(),
                    clip: settings.clip().clone(),
                    source,
                })
        });
        let (settings, clip) = match committed {
            Ok(committed) => committed,
            Err(e) => {
                warn!(pad = %pad, err = %e, "Trigger rejected");
                return Err(e);
            }
        };

        let looping = settings.trigger_mode() == TriggerMode::Unmute && self.options.unmute_loops;
        let voice = Arc::new(Voice::new(pad.clone(), settings, clip, looping));
        let stolen = voices.add(voice.clone());
        self.retire(voices, &stolen, StopReason::VoiceLimit);
        voices.publish();

        self.events.publish(EngineEvent::VoiceStarted {
            pad: pad.clone(),
            voice: voice.id(),
        });
        Ok(TriggerOutcome::Started(VoiceHandle::new(voice)))
    }

    /// Stops voices taken from the manager and reports them. Returns how many were stopped.
    fn retire(&self, voices: &mut VoiceManager, taken: &[Arc<Voice>], reason: StopReason) -> usize {
        let stopped = voices.retire(taken, self.options.fade_frames());
        for voice in stopped.iter() {
            self.events.publish(EngineEvent::VoiceStopped {
                pad: voice.pad_id().clone(),
                voice: voice.id(),
                reason,
            });
        }
        stopped.len()
    }

    /// Releases voices that played to the end of their clip.
    fn reap(&self, voices: &mut VoiceManager) -> usize {
        let finished = voices.take_finished();
        if finished.is_empty() {
            return 0;
        }
        for voice in finished.iter() {
            voice.end();
            self.events.publish(EngineEvent::Progress {
                pad: voice.pad_id().clone(),
                voice: voice.id(),
                percent: 100,
            });
            self.events.publish(EngineEvent::VoiceStopped {
                pad: voice.pad_id().clone(),
                voice: voice.id(),
                reason: StopReason::NaturalEnd,
            });
        }
        debug!(voices = finished.len(), "Released finished voices");
        voices.publish();
        finished.len()
    }
}

impl fmt::Debug for SamplerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SamplerEngine")
            .field("options", &self.options)
            .field("voice_manager", &*self.voices.lock())
            .field("mix", &self.bus.settings())
            .finish()
    }
}
