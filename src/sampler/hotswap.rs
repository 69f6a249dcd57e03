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

//! Per-pad settings mailboxes.
//!
//! Each pad has a single pending slot. Edits overwrite it (last write wins) and the next voice
//! created for the pad takes whatever is there, falling back to the settings the previous voice
//! used. Voices already playing keep their own snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::error::EngineError;
use super::pad::{PadId, PadSettings};

struct Slot {
    pending: Option<Arc<PadSettings>>,
    committed: Arc<PadSettings>,
}

impl Slot {
    fn current(&self) -> &Arc<PadSettings> {
        self.pending.as_ref().unwrap_or(&self.committed)
    }
}

/// The hot-swap queue for every registered pad.
#[derive(Default)]
pub struct SettingsQueue {
    slots: RwLock<HashMap<PadId, Mutex<Slot>>>,
}

impl SettingsQueue {
    pub fn new() -> SettingsQueue {
        SettingsQueue::default()
    }

    /// Registers a pad with its initial settings. Registering an existing pad queues the settings
    /// as an edit instead so that the pad's next voice picks them up.
    pub fn register(&self, pad: PadId, settings: Arc<PadSettings>) {
        let mut slots = self.slots.write();
        match slots.get(&pad) {
            Some(slot) => slot.lock().pending = Some(settings),
            None => {
                slots.insert(
                    pad,
                    Mutex::new(Slot {
                        pending: None,
                        committed: settings,
                    }),
                );
            }
        }
    }

    /// Removes a pad and anything pending for it.
    pub fn unregister(&self, pad: &PadId) -> bool {
        self.slots.write().remove(pad).is_some()
    }

    /// Returns true if the pad is registered.
    pub fn contains(&self, pad: &PadId) -> bool {
        self.slots.read().contains_key(pad)
    }

    /// Replaces the pad's pending settings. An earlier pending edit that was never committed is
    /// discarded.
    pub fn queue_edit(&self, pad: &PadId, settings: Arc<PadSettings>) -> Result<(), EngineError> {
        let slots = self.slots.read();
        let slot = slots
            .get(pad)
            .ok_or_else(|| EngineError::InvalidPadReference(pad.clone()))?;
        let mut slot = slot.lock();
        if slot.pending.is_some() {
            debug!(pad = %pad, "Replacing uncommitted edit");
        }
        slot.pending = Some(settings);
        Ok(())
    }

    /// Returns the settings the next commit would return without consuming anything.
    pub fn peek(&self, pad: &PadId) -> Result<Arc<PadSettings>, EngineError> {
        let slots = self.slots.read();
        let slot = slots
            .get(pad)
            .ok_or_else(|| EngineError::InvalidPadReference(pad.clone()))?;
        let slot = slot.lock();
        Ok(slot.current().clone())
    }

    /// Takes the pending settings, or the last committed settings if nothing is pending.
    pub fn commit(&self, pad: &PadId) -> Result<Arc<PadSettings>, EngineError> {
        self.try_commit(pad, |_| Ok::<_, EngineError>(()))
            .map(|(settings, _)| settings)
    }

    /// Commits the pad's settings only if `prepare` succeeds for them. `prepare` runs while the
    /// slot is locked, so an edit queued concurrently can't slip between the check and the
    /// commit. On failure nothing is consumed.
    pub fn try_commit<T, F>(
        &self,
        pad: &PadId,
        prepare: F,
    ) -> Result<(Arc<PadSettings>, T), EngineError>
    where
        F: FnOnce(&Arc<PadSettings>) -> Result<T, EngineError>,
    {
        let slots = self.slots.read();
        let slot = slots
            .get(pad)
            .ok_or_else(|| EngineError::InvalidPadReference(pad.clone()))?;
        let mut slot = slot.lock();
        let prepared = prepare(slot.current())?;
        if let Some(pending) = slot.pending.take() {
            debug!(pad = %pad, "Committed pending edit");
            slot.committed = pending;
        }
        Ok((slot.committed.clone(), prepared))
    }

    /// Returns true if the pad has an uncommitted edit.
    pub fn has_pending(&self, pad: &PadId) -> bool {
        self.slots
            .read()
            .get(pad)
            .map(|slot| slot.lock().pending.is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::sampler::clip::ClipRef;
    use crate::sampler::pad::TriggerMode;

    fn settings(volume: f32) -> Arc<PadSettings> {
        Arc::new(PadSettings::new(
            ClipRef::new("kick.wav"),
            TriggerMode::Toggle,
            volume,
        ))
    }

    #[test]
    fn commit_falls_back_to_committed() {
        let queue = SettingsQueue::new();
        let pad = PadId::new("kick");
        queue.register(pad.clone(), settings(0.5));

        assert_eq!(queue.commit(&pad).unwrap().volume(), 0.5);
        assert_eq!(queue.commit(&pad).unwrap().volume(), 0.5);
    }

    #[test]
    fn last_write_wins() {
        let queue = SettingsQueue::new();
        let pad = PadId::new("kick");
        queue.register(pad.clone(), settings(0.5));

        queue.queue_edit(&pad, settings(0.7)).unwrap();
        queue.queue_edit(&pad, settings(0.9)).unwrap();
        assert!(queue.has_pending(&pad));
        assert_eq!(queue.peek(&pad).unwrap().volume(), 0.9);

        assert_eq!(queue.commit(&pad).unwrap().volume(), 0.9);
        assert!(!queue.has_pending(&pad));
        assert_eq!(queue.commit(&pad).unwrap().volume(), 0.9);
    }

    #[test]
    fn failed_prepare_keeps_pending() {
        let queue = SettingsQueue::new();
        let pad = PadId::new("kick");
        queue.register(pad.clone(), settings(0.5));
        queue.queue_edit(&pad, settings(0.9)).unwrap();

        let result = queue.try_commit(&pad, |_| {
            Err::<(), _>(EngineError::InvalidPadReference(PadId::new("kick")))
        });
        assert!(result.is_err());
        assert!(queue.has_pending(&pad));
        assert_eq!(queue.commit(&pad).unwrap().volume(), 0.9);
    }

    #[test]
    fn unknown_pad() {
        let queue = SettingsQueue::new();
        let pad = PadId::new("missing");
        assert!(matches!(
            queue.queue_edit(&pad, settings(0.1)),
            Err(EngineError::InvalidPadReference(_))
        ));
        assert!(matches!(
            queue.commit(&pad),
            Err(EngineError::InvalidPadReference(_))
        ));
    }

    #[test]
    fn re_register_queues_edit() {
        let queue = SettingsQueue::new();
        let pad = PadId::new("kick");
        queue.register(pad.clone(), settings(0.5));
        queue.register(pad.clone(), settings(0.6));
        assert!(queue.has_pending(&pad));
        assert_eq!(queue.commit(&pad).unwrap().volume(), 0.6);

        assert!(queue.unregister(&pad));
        assert!(!queue.contains(&pad));
    }

    #[test]
    fn concurrent_edits_are_whole() {
        let queue = Arc::new(SettingsQueue::new());
        let pad = PadId::new("kick");
        queue.register(pad.clone(), settings(0.0));

        let writers: Vec<_> = (1..=8)
            .map(|i| {
                let queue = queue.clone();
                let pad = pad.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        let edit = PadSettings::new(
                            ClipRef::new(format!("clip-{i}.wav")),
                            TriggerMode::Toggle,
                            i as f32 / 10.0,
                        );
                        queue.queue_edit(&pad, Arc::new(edit)).unwrap();
                    }
                })
            })
            .collect();

        for _ in 0..200 {
            let committed = queue.commit(&pad).unwrap();
            if committed.volume() > 0.0 {
                let i = (committed.volume() * 10.0).round() as usize;
                assert_eq!(committed.clip().as_str(), format!("clip-{i}.wav"));
            }
        }

        for writer in writers {
            writer.join().unwrap();
        }
    }
}
