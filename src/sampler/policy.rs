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
use super::pad::TriggerMode;

/// What the performer did to a pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Press,
    Release,
}

/// What the voice manager should do in response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create a new voice.
    Start,
    /// Stop every live voice of the pad.
    Stop,
    /// Flip the audibility of the pad's persistent voice.
    ToggleMute,
    Ignore,
}

/// Decides what a press or release does, given the pad's trigger mode and how many live voices
/// it has.
pub fn transition(mode: TriggerMode, live_voices: usize, intent: Intent) -> Action {
    let live = live_voices > 0;
    match (intent, live) {
        (Intent::Press, false) => Action::Start,
        (Intent::Release, false) => Action::Ignore,
        (Intent::Release, true) => match mode {
            // Stutter voices end on their own or through a stop-all.
            TriggerMode::Stutter => Action::Ignore,
            _ => Action::Stop,
        },
        (Intent::Press, true) => match mode {
            TriggerMode::Toggle => Action::Stop,
            TriggerMode::Hold => Action::Ignore,
            TriggerMode::Stutter => Action::Start,
            TriggerMode::Unmute => Action::ToggleMute,
        },
    }
}
