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
use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{debug, info};

use super::shortcuts::{Binding, GlobalAction, Shortcut, ShortcutMap};
use super::Event;
use crate::sampler::{
    display_percent, BankId, EngineError, MixChange, MixSettings, PadId, SamplerEngine,
    StopScope, TriggerOutcome,
};
use crate::util::duration_minutes_seconds;

/// Master volume change per arrow key press.
const MASTER_STEP: f32 = 0.05;

/// What an event did.
#[derive(Debug)]
pub enum Routed {
    Trigger(PadId, TriggerOutcome),
    Stopped(usize),
    Mix(MixSettings),
    BankSelected(BankId),
    Status(String),
    /// A key with no binding, or the unassigned global key.
    Unbound,
}

/// Turns controller events into engine calls and tracks the selected bank.
pub struct Router {
    engine: Arc<SamplerEngine>,
    shortcuts: ShortcutMap,
    banks: Vec<BankId>,
    selected: usize,
}

impl Router {
    pub fn new(engine: Arc<SamplerEngine>, shortcuts: ShortcutMap, banks: Vec<BankId>) -> Router {
        Router {
            engine,
            shortcuts,
            banks,
            selected: 0,
        }
    }

    pub fn selected_bank(&self) -> Option<&BankId> {
        self.banks.get(self.selected)
    }

    pub fn handle(&mut self, event: Event) -> Result<Routed, EngineError> {
        match event {
            Event::Press(pad) => {
                let outcome = self.engine.trigger(&pad)?;
                Ok(Routed::Trigger(pad, outcome))
            }
            Event::Release(pad) => {
                let outcome = self.engine.stop_explicit(&pad)?;
                Ok(Routed::Trigger(pad, outcome))
            }
            Event::Key(shortcut) => self.handle_key(&shortcut),
            Event::Stop(Some(bank)) => Ok(Routed::Stopped(
                self.engine.stop_all(&StopScope::Bank(bank)),
            )),
            Event::Stop(None) => Ok(Routed::Stopped(self.engine.stop_all(&StopScope::Global))),
            Event::ToggleMute => Ok(Routed::Mix(self.engine.apply_mix(MixChange::ToggleMute))),
            Event::MasterVolume(volume) => Ok(Routed::Mix(
                self.engine.apply_mix(MixChange::MasterVolume(volume)),
            )),
            Event::Eq(eq) => Ok(Routed::Mix(self.engine.apply_mix(MixChange::Eq(eq)))),
            Event::Status => Ok(Routed::Status(self.status())),
        }
    }

    fn handle_key(&mut self, shortcut: &Shortcut) -> Result<Routed, EngineError> {
        if let Some(action) = GlobalAction::for_shortcut(shortcut) {
            debug!(key = %shortcut, action = ?action, "Global binding");
            return Ok(match action {
                GlobalAction::StopAll => {
                    Routed::Stopped(self.engine.stop_all(&StopScope::Global))
                }
                GlobalAction::ToggleMute => {
                    Routed::Mix(self.engine.apply_mix(MixChange::ToggleMute))
                }
                GlobalAction::MasterUp => self.step_master(MASTER_STEP),
                GlobalAction::MasterDown => self.step_master(-MASTER_STEP),
                GlobalAction::PreviousBank => self.step_bank(false),
                GlobalAction::NextBank => self.step_bank(true),
                GlobalAction::StopSelectedBank => match self.selected_bank() {
                    Some(bank) => {
                        Routed::Stopped(self.engine.stop_all(&StopScope::Bank(bank.clone())))
                    }
                    None => Routed::Stopped(0),
                },
                GlobalAction::Unassigned => Routed::Unbound,
            });
        }

        match self.shortcuts.lookup(shortcut).cloned() {
            Some(Binding::Pad(pad)) => {
                let outcome = self.engine.trigger(&pad)?;
                Ok(Routed::Trigger(pad, outcome))
            }
            Some(Binding::Bank(bank)) => Ok(self.select(&bank)),
            None => {
                debug!(key = %shortcut, "Unbound key");
                Ok(Routed::Unbound)
            }
        }
    }

    fn step_master(&self, step: f32) -> Routed {
        let current = self.engine.mix().settings().master_volume();
        // Round to the step so repeated presses land on whole percentages.
        let target = ((current + step) / MASTER_STEP).round() * MASTER_STEP;
        Routed::Mix(self.engine.apply_mix(MixChange::MasterVolume(target)))
    }

    fn step_bank(&mut self, forward: bool) -> Routed {
        if self.banks.is_empty() {
            return Routed::Unbound;
        }
        let len = self.banks.len();
        self.selected = if forward {
            (self.selected + 1) % len
        } else {
            (self.selected + len - 1) % len
        };
        let bank = self.banks[self.selected].clone();
        info!(bank = %bank, "Bank selected");
        Routed::BankSelected(bank)
    }

    fn select(&mut self, bank: &BankId) -> Routed {
        match self.banks.iter().position(|b| b == bank) {
            Some(index) => {
                self.selected = index;
                info!(bank = %bank, "Bank selected");
                Routed::BankSelected(bank.clone())
            }
            None => Routed::Unbound,
        }
    }

    fn status(&self) -> String {
        let mix = self.engine.mix().settings();
        let mut status = format!(
            "master {}%{} eq {:+.1}/{:+.1}/{:+.1} dB, bank {}",
            display_percent(mix.master_volume()),
            if mix.muted() { " (muted)" } else { "" },
            mix.eq().low(),
            mix.eq().mid(),
            mix.eq().high(),
            self.selected_bank().map(BankId::as_str).unwrap_or("-"),
        );
        for voice in self.engine.all_live_voices() {
            let progress = voice.progress();
            let _ = write!(
                status,
                "\n  {} [{}] {}% {} left{}",
                voice.pad_id(),
                voice.settings().trigger_mode(),
                progress.percent,
                duration_minutes_seconds(progress.remaining),
                if voice.is_muted() { " (muted)" } else { "" },
            );
        }
        status
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::config::{BankDefinition, PadDefinition};
    use crate::sampler::{TriggerMode, VoiceState};
    use crate::testutil::{test_engine, test_options};

    fn router() -> Router {
        let (engine, _cache) = test_engine(
            test_options(),
            &[
                ("drums", "kick", TriggerMode::Toggle, 1.0),
                ("drums", "snare", TriggerMode::Stutter, 1.0),
                ("fx", "riser", TriggerMode::Toggle, 1.0),
                ("fx", "pad", TriggerMode::Unmute, 1.0),
            ],
        );
        let banks = vec![
            BankDefinition::new(
                "drums",
                vec![PadDefinition::new("kick", "kick.wav", TriggerMode::Toggle, 1.0)
                    .with_shortcut_key("k")],
            )
            .with_shortcut_key("1"),
            BankDefinition::new(
                "fx",
                vec![PadDefinition::new("riser", "riser.wav", TriggerMode::Toggle, 1.0)
                    .with_shortcut_key("r")],
            )
            .with_shortcut_key("2"),
        ];
        let shortcuts = ShortcutMap::from_banks(&banks).unwrap();
        Router::new(
            Arc::new(engine),
            shortcuts,
            vec![BankId::new("drums"), BankId::new("fx")],
        )
    }

    fn key(router: &mut Router, combo: &str) -> Routed {
        router
            .handle(Event::Key(Shortcut::parse(combo).unwrap()))
            .unwrap()
    }

    #[test]
    fn pad_keys_trigger() {
        let mut router = router();
        assert!(matches!(
            key(&mut router, "k"),
            Routed::Trigger(_, TriggerOutcome::Started(_))
        ));
        assert!(router.engine.is_playing(&PadId::new("kick")));
        assert!(matches!(
            key(&mut router, "K"),
            Routed::Trigger(_, TriggerOutcome::Stopped(1))
        ));
        assert!(!router.engine.is_playing(&PadId::new("kick")));
        assert!(matches!(key(&mut router, "q"), Routed::Unbound));
    }

    #[test]
    fn space_stops_everything() {
        let mut router = router();
        router.handle(Event::Press(PadId::new("kick"))).unwrap();
        router.handle(Event::Press(PadId::new("riser"))).unwrap();
        assert!(matches!(key(&mut router, "Space"), Routed::Stopped(2)));
        assert_eq!(router.engine.active_voice_count(), 0);
    }

    #[test]
    fn z_stops_selected_bank() {
        let mut router = router();
        router.handle(Event::Press(PadId::new("kick"))).unwrap();
        router.handle(Event::Press(PadId::new("riser"))).unwrap();

        assert!(matches!(key(&mut router, "2"), Routed::BankSelected(_)));
        assert_eq!(router.selected_bank(), Some(&BankId::new("fx")));
        assert!(matches!(key(&mut router, "z"), Routed::Stopped(1)));
        assert!(router.engine.is_playing(&PadId::new("kick")));
        assert!(!router.engine.is_playing(&PadId::new("riser")));
    }

    #[test]
    fn bank_cycling() {
        let mut router = router();
        assert_eq!(router.selected_bank(), Some(&BankId::new("drums")));
        key(&mut router, "n");
        assert_eq!(router.selected_bank(), Some(&BankId::new("fx")));
        key(&mut router, "n");
        assert_eq!(router.selected_bank(), Some(&BankId::new("drums")));
        key(&mut router, "b");
        assert_eq!(router.selected_bank(), Some(&BankId::new("fx")));
    }

    #[test]
    fn mute_and_master() {
        let mut router = router();
        assert!(matches!(key(&mut router, "m"), Routed::Mix(mix) if mix.muted()));
        assert!(matches!(key(&mut router, "m"), Routed::Mix(mix) if !mix.muted()));

        // Already at full volume.
        key(&mut router, "ArrowUp");
        assert_eq!(router.engine.mix().settings().master_volume(), 1.0);
        key(&mut router, "ArrowDown");
        key(&mut router, "ArrowDown");
        let volume = router.engine.mix().settings().master_volume();
        assert!((volume - 0.9).abs() < 1e-6, "volume was {volume}");
    }

    #[test]
    fn x_does_nothing() {
        let mut router = router();
        router.handle(Event::Press(PadId::new("kick"))).unwrap();
        let before = router.engine.mix().settings();
        assert!(matches!(key(&mut router, "x"), Routed::Unbound));
        assert!(router.engine.is_playing(&PadId::new("kick")));
        assert_eq!(router.engine.mix().settings(), before);
    }

    #[test]
    fn release_and_unknown_pads() {
        let mut router = router();
        assert!(matches!(
            router.handle(Event::Press(PadId::new("nope"))),
            Err(EngineError::InvalidPadReference(_))
        ));

        router.handle(Event::Press(PadId::new("pad"))).unwrap();
        assert!(matches!(
            router.handle(Event::Press(PadId::new("pad"))).unwrap(),
            Routed::Trigger(_, TriggerOutcome::Muted(true))
        ));
        let voices = router.engine.live_voices(&PadId::new("pad"));
        assert_eq!(voices.len(), 1);
        assert!(voices[0].is_muted());
        assert_ne!(voices[0].state(), VoiceState::Ended);
    }

    #[test]
    fn status_lists_voices() {
        let mut router = router();
        router.handle(Event::Press(PadId::new("kick"))).unwrap();
        router.handle(Event::ToggleMute).unwrap();
        let Routed::Status(status) = router.handle(Event::Status).unwrap() else {
            panic!("expected status");
        };
        assert!(status.starts_with("master 100% (muted)"), "{status}");
        assert!(status.contains("bank drums"), "{status}");
        assert!(status.contains("kick [toggle] 0% 0:01 left"), "{status}");
    }
}
