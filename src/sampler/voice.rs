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

//! Voices and their bookkeeping.
//!
//! A voice is shared between the voice manager, which decides when it stops, and the render
//! path, which advances its cursor. Everything the render path touches is atomic so it never
//! waits on the manager.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use super::clip::LoadedClip;
use super::pad::{BankId, PadId, PadSettings};
use super::progress::{self, ProgressSample};
use crate::playsync::CancelHandle;

/// Global voice ID counter.
static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

/// A process-unique voice identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VoiceId(u64);

impl VoiceId {
    fn next() -> VoiceId {
        VoiceId(NEXT_VOICE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn for_tests(value: u64) -> VoiceId {
        VoiceId(value)
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The lifecycle of a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VoiceState {
    /// Created and published, not yet rendered.
    Starting = 0,
    /// Rendered at least once.
    Playing = 1,
    /// Stopped, finishing its fade tail.
    Stopping = 2,
    /// Terminal.
    Ended = 3,
}

impl VoiceState {
    fn from_u8(value: u8) -> VoiceState {
        match value {
            0 => VoiceState::Starting,
            1 => VoiceState::Playing,
            2 => VoiceState::Stopping,
            _ => VoiceState::Ended,
        }
    }

    /// Live voices count towards the pad's trigger policy.
    pub fn is_live(&self) -> bool {
        matches!(self, VoiceState::Starting | VoiceState::Playing)
    }
}

/// One playback instance of a pad's clip.
pub struct Voice {
    id: VoiceId,
    pad_id: PadId,
    /// Fixed at creation.
    settings: Arc<PadSettings>,
    clip: Arc<LoadedClip>,
    started_at: Instant,
    /// Looping voices wrap around instead of ending.
    looping: bool,
    /// Frames rendered since the voice started. Never decreases.
    cursor: AtomicU64,
    state: AtomicU8,
    /// Audibility gate for unmute pads.
    muted: AtomicBool,
    /// Length of the fade applied once the voice is stopped.
    fade_frames: AtomicU32,
    /// Cancelled once the voice has ended.
    ended: CancelHandle,
}

impl Voice {
    pub(crate) fn new(
        pad_id: PadId,
        settings: Arc<PadSettings>,
        clip: Arc<LoadedClip>,
        looping: bool,
    ) -> Voice {
        Voice {
            id: VoiceId::next(),
            pad_id,
            settings,
            clip,
            started_at: Instant::now(),
            looping,
            cursor: AtomicU64::new(0),
            state: AtomicU8::new(VoiceState::Starting as u8),
            muted: AtomicBool::new(false),
            fade_frames: AtomicU32::new(0),
            ended: CancelHandle::new(),
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn pad_id(&self) -> &PadId {
        &self.pad_id
    }

    pub fn settings(&self) -> &Arc<PadSettings> {
        &self.settings
    }

    pub fn clip(&self) -> &Arc<LoadedClip> {
        &self.clip
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::Acquire)
    }

    pub fn state(&self) -> VoiceState {
        VoiceState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }

    pub(crate) fn fade_frames(&self) -> u32 {
        self.fade_frames.load(Ordering::Acquire)
    }

    /// Returns true once a non-looping voice has rendered its whole clip.
    pub fn reached_end(&self) -> bool {
        !self.looping && self.cursor() >= self.clip.frames()
    }

    /// Marks the voice as rendered. Only moves forward from Starting.
    pub(crate) fn mark_playing(&self) {
        let _ = self.state.compare_exchange(
            VoiceState::Starting as u8,
            VoiceState::Playing as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Stops a live voice. With a fade the voice moves to Stopping and the render path ends it
    /// once the fade is done; without one it ends immediately. Returns false if the voice was
    /// already stopping or ended.
    pub(crate) fn stop(&self, fade_frames: u32) -> bool {
        self.fade_frames.store(fade_frames, Ordering::Release);
        let target = if fade_frames == 0 {
            VoiceState::Ended
        } else {
            VoiceState::Stopping
        };

        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if !VoiceState::from_u8(current).is_live() {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                target as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        if target == VoiceState::Ended {
            self.ended.cancel();
        }
        true
    }

    /// Ends the voice. Returns false if it had already ended.
    pub(crate) fn end(&self) -> bool {
        let previous = self.state.swap(VoiceState::Ended as u8, Ordering::AcqRel);
        self.ended.cancel();
        previous != VoiceState::Ended as u8
    }

    /// Advances the cursor. Only the render path calls this.
    #[inline]
    pub(crate) fn advance(&self, frames: u64) {
        self.cursor.fetch_add(frames, Ordering::AcqRel);
    }

    /// Flips audibility and returns the new muted state.
    pub(crate) fn toggle_muted(&self) -> bool {
        !self.muted.fetch_xor(true, Ordering::AcqRel)
    }
}

impl fmt::Debug for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Voice")
            .field("id", &self.id)
            .field("pad_id", &self.pad_id)
            .field("state", &self.state())
            .field("cursor", &self.cursor())
            .field("looping", &self.looping)
            .finish()
    }
}

/// A caller's view of a voice.
#[derive(Clone, Debug)]
pub struct VoiceHandle(Arc<Voice>);

impl VoiceHandle {
    pub(crate) fn new(voice: Arc<Voice>) -> VoiceHandle {
        VoiceHandle(voice)
    }

    pub fn id(&self) -> VoiceId {
        self.0.id()
    }

    pub fn pad_id(&self) -> &PadId {
        self.0.pad_id()
    }

    pub fn settings(&self) -> &Arc<PadSettings> {
        self.0.settings()
    }

    pub fn state(&self) -> VoiceState {
        self.0.state()
    }

    pub fn is_muted(&self) -> bool {
        self.0.is_muted()
    }

    pub fn progress(&self) -> ProgressSample {
        progress::sample(&self.0)
    }

    /// Waits until the voice has ended. Returns false on timeout.
    pub fn wait_for_end(&self, timeout: Duration) -> bool {
        self.0.ended.wait_timeout(timeout)
    }
}

/// The voice list published to the render path. Publishing swaps the whole list; readers only
/// clone the pointer under the lock.
#[derive(Default)]
pub struct VoiceTable {
    current: Mutex<Arc<Vec<Arc<Voice>>>>,
}

impl VoiceTable {
    pub fn new() -> VoiceTable {
        VoiceTable::default()
    }

    pub(crate) fn publish(&self, voices: Vec<Arc<Voice>>) {
        *self.current.lock() = Arc::new(voices);
    }

    /// Returns the current voice list.
    #[inline]
    pub fn snapshot(&self) -> Arc<Vec<Arc<Voice>>> {
        self.current.lock().clone()
    }
}

/// Tracks live voices, enforces the voice cap and owns bank membership.
pub(crate) struct VoiceManager {
    /// Live voices, oldest first.
    voices: Vec<Arc<Voice>>,
    /// Stopped voices still rendering a fade tail.
    fading: Vec<Arc<Voice>>,
    /// Global maximum voices limit.
    max_voices: usize,
    table: Arc<VoiceTable>,
    banks: HashMap<PadId, BankId>,
}

impl VoiceManager {
    pub(crate) fn new(max_voices: usize, table: Arc<VoiceTable>) -> VoiceManager {
        VoiceManager {
            voices: Vec::new(),
            fading: Vec::new(),
            max_voices: max_voices.max(1),
            table,
            banks: HashMap::new(),
        }
    }

    pub(crate) fn assign_bank(&mut self, pad: PadId, bank: BankId) -> Option<BankId> {
        self.banks.insert(pad, bank)
    }

    pub(crate) fn forget_pad(&mut self, pad: &PadId) -> Option<BankId> {
        self.banks.remove(pad)
    }

    pub(crate) fn pads(&self) -> impl Iterator<Item = &PadId> {
        self.banks.keys()
    }

    /// Returns the live voices of a pad, oldest first.
    pub(crate) fn live_for(&self, pad: &PadId) -> Vec<Arc<Voice>> {
        self.voices
            .iter()
            .filter(|v| v.pad_id() == pad)
            .cloned()
            .collect()
    }

    pub(crate) fn live_count_for(&self, pad: &PadId) -> usize {
        self.voices.iter().filter(|v| v.pad_id() == pad).count()
    }

    /// Adds a new voice, stealing the oldest voices if the cap is exceeded. Returns the voices
    /// that were stolen; the caller stops them.
    pub(crate) fn add(&mut self, voice: Arc<Voice>) -> Vec<Arc<Voice>> {
        let mut stolen = Vec::new();
        while self.voices.len() >= self.max_voices {
            let oldest = self.voices.remove(0);
            warn!(
                max_voices = self.max_voices,
                pad = %oldest.pad_id(),
                "Global voice limit reached, stealing oldest"
            );
            stolen.push(oldest);
        }
        debug!(pad = %voice.pad_id(), voice = %voice.id(), "Voice added");
        self.voices.push(voice);
        stolen
    }

    /// Removes and returns the live voices of a pad.
    pub(crate) fn take_pad(&mut self, pad: &PadId) -> Vec<Arc<Voice>> {
        self.take_where(|v| v.pad_id() == pad)
    }

    /// Removes and returns the live voices of every pad in a bank.
    pub(crate) fn take_bank(&mut self, bank: &BankId) -> Vec<Arc<Voice>> {
        let banks = &self.banks;
        let (taken, kept): (Vec<_>, Vec<_>) = self
            .voices
            .drain(..)
            .partition(|v| banks.get(v.pad_id()) == Some(bank));
        self.voices = kept;
        taken
    }

    /// Removes and returns every live voice.
    pub(crate) fn take_all(&mut self) -> Vec<Arc<Voice>> {
        std::mem::take(&mut self.voices)
    }

    /// Removes and returns voices that have played their clip to the end.
    pub(crate) fn take_finished(&mut self) -> Vec<Arc<Voice>> {
        self.take_where(|v| v.reached_end())
    }

    fn take_where<F>(&mut self, predicate: F) -> Vec<Arc<Voice>>
    where
        F: Fn(&Arc<Voice>) -> bool,
    {
        let (taken, kept): (Vec<_>, Vec<_>) = self.voices.drain(..).partition(|v| predicate(v));
        self.voices = kept;
        taken
    }

    /// Stops voices that were taken from the live list and returns the ones this call actually
    /// stopped. Voices with a fade stay published until the render path ends them.
    pub(crate) fn retire<'a>(
        &mut self,
        voices: &'a [Arc<Voice>],
        fade_frames: u32,
    ) -> Vec<&'a Arc<Voice>> {
        let mut stopped = Vec::with_capacity(voices.len());
        for voice in voices {
            if voice.stop(fade_frames) {
                if voice.state() == VoiceState::Stopping {
                    self.fading.push(voice.clone());
                }
                stopped.push(voice);
            }
        }
        stopped
    }

    /// Drops fading voices the render path has finished. Returns true if any were dropped.
    pub(crate) fn prune_fading(&mut self) -> bool {
        let before = self.fading.len();
        self.fading.retain(|v| v.state() != VoiceState::Ended);
        self.fading.len() != before
    }

    /// Publishes the live and fading voices to the render path.
    pub(crate) fn publish(&mut self) {
        self.prune_fading();
        let mut published = Vec::with_capacity(self.voices.len() + self.fading.len());
        published.extend(self.voices.iter().cloned());
        published.extend(self.fading.iter().cloned());
        self.table.publish(published);
    }

    /// Returns the current number of live voices.
    pub(crate) fn active_count(&self) -> usize {
        self.voices.len()
    }

    pub(crate) fn live(&self) -> &[Arc<Voice>] {
        &self.voices
    }

    pub(crate) fn fading_count(&self) -> usize {
        self.fading.len()
    }
}

impl fmt::Debug for VoiceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceManager")
            .field("active_voices", &self.voices.len())
            .field("fading_voices", &self.fading.len())
            .field("max_voices", &self.max_voices)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::clip::ClipRef;
    use crate::sampler::pad::TriggerMode;

    fn make_voice(pad: &str, frames: usize) -> Arc<Voice> {
        let settings = Arc::new(PadSettings::new(
            ClipRef::new(format!("{pad}.wav")),
            TriggerMode::Stutter,
            1.0,
        ));
        let clip = Arc::new(LoadedClip::new(vec![0.5; frames], 1, 48000));
        Arc::new(Voice::new(PadId::new(pad), settings, clip, false))
    }

    #[test]
    fn voice_ids_are_unique() {
        let a = make_voice("kick", 10);
        let b = make_voice("kick", 10);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn voice_lifecycle() {
        let voice = make_voice("kick", 10);
        assert_eq!(voice.state(), VoiceState::Starting);
        voice.mark_playing();
        assert_eq!(voice.state(), VoiceState::Playing);

        assert!(voice.stop(64));
        assert_eq!(voice.state(), VoiceState::Stopping);
        assert!(!voice.stop(64));

        // A stopped voice never goes back to playing.
        voice.mark_playing();
        assert_eq!(voice.state(), VoiceState::Stopping);

        assert!(voice.end());
        assert!(!voice.end());
        assert_eq!(voice.state(), VoiceState::Ended);
        assert!(VoiceHandle::new(voice).wait_for_end(Duration::ZERO));
    }

    #[test]
    fn abrupt_stop_ends() {
        let voice = make_voice("kick", 10);
        assert!(voice.stop(0));
        assert_eq!(voice.state(), VoiceState::Ended);
    }

    #[test]
    fn reached_end() {
        let voice = make_voice("kick", 10);
        voice.advance(9);
        assert!(!voice.reached_end());
        voice.advance(1);
        assert!(voice.reached_end());
    }

    #[test]
    fn toggle_muted() {
        let voice = make_voice("kick", 10);
        assert!(voice.toggle_muted());
        assert!(voice.is_muted());
        assert!(!voice.toggle_muted());
        assert!(!voice.is_muted());
    }

    #[test]
    fn global_limit_steals_oldest() {
        let table = Arc::new(VoiceTable::new());
        let mut manager = VoiceManager::new(3, table);

        let voices: Vec<_> = (1..=3).map(|i| make_voice(&format!("pad{i}"), 10)).collect();
        for voice in voices.iter() {
            assert!(manager.add(voice.clone()).is_empty());
        }

        let stolen = manager.add(make_voice("pad4", 10));
        assert_eq!(stolen.len(), 1);
        assert_eq!(stolen[0].id(), voices[0].id());
        assert_eq!(manager.active_count(), 3);
    }

    #[test]
    fn take_bank_uses_membership() {
        let table = Arc::new(VoiceTable::new());
        let mut manager = VoiceManager::new(16, table);
        manager.assign_bank(PadId::new("kick"), BankId::new("drums"));
        manager.assign_bank(PadId::new("pad"), BankId::new("synths"));

        manager.add(make_voice("kick", 10));
        manager.add(make_voice("pad", 10));
        manager.add(make_voice("kick", 10));

        let taken = manager.take_bank(&BankId::new("drums"));
        assert_eq!(taken.len(), 2);
        assert_eq!(manager.active_count(), 1);
        assert_eq!(manager.live_count_for(&PadId::new("pad")), 1);
    }

    #[test]
    fn retire_keeps_fading_voices_published() {
        let table = Arc::new(VoiceTable::new());
        let mut manager = VoiceManager::new(16, table.clone());
        let voice = make_voice("kick", 10);
        manager.add(voice.clone());
        manager.publish();
        assert_eq!(table.snapshot().len(), 1);

        let taken = manager.take_pad(&PadId::new("kick"));
        assert_eq!(manager.retire(&taken, 32).len(), 1);
        assert!(manager.retire(&taken, 32).is_empty());
        manager.publish();
        assert_eq!(table.snapshot().len(), 1);
        assert_eq!(manager.fading_count(), 1);

        voice.end();
        assert!(manager.prune_fading());
        manager.publish();
        assert!(table.snapshot().is_empty());
        assert_eq!(manager.fading_count(), 0);
    }
}
