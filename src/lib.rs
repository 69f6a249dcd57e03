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

//! A pad sampler playback engine.
//!
//! Pads are grouped into banks and each pad plays one preloaded clip under a trigger mode
//! (toggle, hold, stutter or unmute). Every active voice is mixed through a shared bus with a
//! master volume, a global mute and a three band EQ. Edited pad settings are handed to the next
//! voice for that pad without disturbing anything already playing.

pub mod audio;
pub mod config;
pub mod controller;
pub mod playsync;
pub mod sampler;
pub mod util;

#[cfg(test)]
pub(crate) mod testutil;
