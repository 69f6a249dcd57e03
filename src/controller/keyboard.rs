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
use std::io;

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::shortcuts::Shortcut;
use super::Event;
use crate::sampler::{BankId, EqSettings, PadId};

const PRESS: &str = "press";
const RELEASE: &str = "release";
const KEY: &str = "key";
const STOP: &str = "stop";
const MUTE: &str = "mute";
const MASTER: &str = "master";
const EQ: &str = "eq";
const STATUS: &str = "status";

/// A controller that reads typed commands from stdin.
pub struct Driver {}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses one typed command. Returns None for anything unrecognized.
fn parse_command(input: &str) -> Option<Event> {
    let mut words = input.split_whitespace();
    let command = words.next()?.to_lowercase();
    let args: Vec<&str> = words.collect();

    match (command.as_str(), args.as_slice()) {
        (PRESS, [pad]) => Some(Event::Press(PadId::new(*pad))),
        (RELEASE, [pad]) => Some(Event::Release(PadId::new(*pad))),
        (KEY, [combo]) => Shortcut::parse(combo).ok().map(Event::Key),
        (STOP, []) => Some(Event::Stop(None)),
        (STOP, [bank]) => Some(Event::Stop(Some(BankId::new(*bank)))),
        (MUTE, []) => Some(Event::ToggleMute),
        (MASTER, [volume]) => volume
            .parse::<f32>()
            .ok()
            .filter(|v| (0.0..=1.0).contains(v))
            .map(Event::MasterVolume),
        (EQ, [low, mid, high]) => {
            let low = low.parse::<f32>().ok()?;
            let mid = mid.parse::<f32>().ok()?;
            let high = high.parse::<f32>().ok()?;
            Some(Event::Eq(EqSettings::new(low, mid, high)))
        }
        (STATUS, []) => Some(Event::Status),
        _ => None,
    }
}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Reads and forwards one command. Returns false once the input is closed.
    fn monitor_io<R, W>(events_tx: &Sender<Event>, mut reader: R, mut writer: W) -> io::Result<bool>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command ({} <pad>, {} <pad>, {} <combo>, {} [bank], {}, {} <0..1>, {} <low> <mid> <high>, {}): ",
            PRESS, RELEASE, KEY, STOP, MUTE, MASTER, EQ, STATUS,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }
        if input.trim().is_empty() {
            return Ok(true);
        }

        match parse_command(&input) {
            Some(event) => events_tx
                .blocking_send(event)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?,
            None => warn!(input = input.trim(), "Unrecognized input"),
        }
        Ok(true)
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&events_tx, io::stdin().lock(), io::stderr())? {}
            info!("Keyboard input closed.");
            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use std::io::{self, BufReader};
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use super::*;
    use crate::controller::{shortcuts::ShortcutMap, Router};
    use crate::sampler::{write_json_lines, TriggerMode};
    use crate::testutil::{test_engine, test_options};

    fn get_event(input: &str) -> Result<Option<Event>, io::Error> {
        let (sender, mut receiver) = mpsc::channel::<Event>(1);
        let reader = BufReader::new(input.as_bytes());
        let mut writer: Vec<u8> = Vec::new();
        assert!(Driver::monitor_io(&sender, reader, &mut writer)?);
        assert!(!writer.is_empty());

        // Force the sender to close.
        drop(sender);
        Ok(receiver.blocking_recv())
    }

    #[test]
    fn test_keyboard_events() -> Result<(), io::Error> {
        assert_eq!(
            Some(Event::Press(PadId::new("kick"))),
            get_event("press kick\n")?
        );
        assert_eq!(
            Some(Event::Release(PadId::new("kick"))),
            get_event("RELEASE kick")?
        );
        assert_eq!(
            Some(Event::Key(Shortcut::parse("Ctrl+K").unwrap())),
            get_event("key ctrl+k")?
        );
        assert_eq!(Some(Event::Stop(None)), get_event("stop")?);
        assert_eq!(
            Some(Event::Stop(Some(BankId::new("drums")))),
            get_event("stop drums")?
        );
        assert_eq!(Some(Event::ToggleMute), get_event("mute")?);
        assert_eq!(Some(Event::MasterVolume(0.25)), get_event("master 0.25")?);
        assert_eq!(
            Some(Event::Eq(EqSettings::new(3.0, 0.0, -6.0))),
            get_event("eq 3 0 -6")?
        );
        assert_eq!(Some(Event::Status), get_event("status")?);
        Ok(())
    }

    #[test]
    fn test_rejected_input() -> Result<(), io::Error> {
        assert_eq!(None, get_event("unrecognized")?);
        assert_eq!(None, get_event("press")?);
        assert_eq!(None, get_event("master 2")?);
        assert_eq!(None, get_event("master loud")?);
        assert_eq!(None, get_event("eq 1 2")?);
        assert_eq!(None, get_event("key Enter")?);
        assert_eq!(None, get_event("\n")?);
        Ok(())
    }

    #[test]
    fn test_prompts_stay_out_of_events() -> Result<(), Box<dyn std::error::Error>> {
        let (engine, _cache) = test_engine(
            test_options(),
            &[("drums", "kick", TriggerMode::Toggle, 1.0)],
        );
        let engine = Arc::new(engine);
        let events = engine.subscribe();
        let mut router = Router::new(
            engine.clone(),
            ShortcutMap::default(),
            vec![BankId::new("drums")],
        );

        let (sender, mut receiver) = mpsc::channel::<Event>(4);
        let mut prompts: Vec<u8> = Vec::new();
        for line in ["press kick\n", "status\n", "press kick\n"] {
            let reader = BufReader::new(line.as_bytes());
            assert!(Driver::monitor_io(&sender, reader, &mut prompts)?);
            let event = receiver.try_recv()?;
            router.handle(event)?;
        }

        let mut out: Vec<u8> = Vec::new();
        write_json_lines(events.try_iter(), &mut out)?;
        let out = String::from_utf8(out)?;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2, "{out}");
        for line in lines {
            let json: serde_json::Value = serde_json::from_str(line)?;
            assert_eq!(json["pad"], "kick");
        }
        assert!(!out.contains("Command"));
        assert!(String::from_utf8(prompts)?.starts_with("Command"));
        Ok(())
    }

    #[test]
    fn test_closed_input() -> Result<(), io::Error> {
        let (sender, _receiver) = mpsc::channel::<Event>(1);
        let reader = BufReader::new("".as_bytes());
        assert!(!Driver::monitor_io(&sender, reader, io::sink())?);
        Ok(())
    }
}
