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
use std::io::{self, Write};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::Serialize;

use super::pad::PadId;
use super::voice::VoiceId;

/// Why a voice stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    UserStop,
    NaturalEnd,
    StopAll,
    VoiceLimit,
}

/// Events published by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    VoiceStarted {
        pad: PadId,
        voice: VoiceId,
    },
    VoiceStopped {
        pad: PadId,
        voice: VoiceId,
        reason: StopReason,
    },
    Progress {
        pad: PadId,
        voice: VoiceId,
        percent: u8,
    },
    MuteChanged {
        pad: PadId,
        voice: VoiceId,
        muted: bool,
    },
}

/// Fans events out to subscribers. Publishing never blocks and subscribers that have gone away
/// are dropped.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<EngineEvent>>>,
}

impl EventBus {
    pub fn new() -> EventBus {
        EventBus::default()
    }

    /// Adds a subscriber.
    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn publish(&self, event: EngineEvent) {
        let mut subscribers = self.subscribers.lock();
        if subscribers.is_empty() {
            return;
        }
        subscribers.retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

/// Writes each event as one JSON object per line, flushing after every line so a consumer sees
/// events as they happen.
pub fn write_json_lines<I, W>(events: I, mut writer: W) -> io::Result<()>
where
    I: IntoIterator<Item = EngineEvent>,
    W: Write,
{
    for event in events {
        serde_json::to_writer(&mut writer, &event)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    Ok(())
}
