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

//! Keyboard shortcuts for pads and banks, and the reserved global bindings.

use std::collections::HashMap;
use std::fmt;

use crate::config::BankDefinition;
use crate::sampler::{BankId, PadId};

/// Keys that have a global binding and can't be used bare by pads or banks.
pub const RESERVED_KEYS: [&str; 8] = ["Space", "M", "Z", "X", "B", "N", "ArrowDown", "ArrowUp"];

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ShortcutError {
    #[error("{0:?} is not a valid shortcut")]
    Invalid(String),

    #[error("{owner} uses {key}, which is reserved")]
    Reserved { owner: String, key: String },

    #[error("{key} is bound to both {first} and {second}")]
    Duplicate {
        key: String,
        first: String,
        second: String,
    },
}

/// Modifier keys held with a shortcut.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn none() -> Modifiers {
        Modifiers::default()
    }

    pub fn is_empty(&self) -> bool {
        !(self.shift || self.ctrl || self.alt || self.meta)
    }
}

/// A normalized key combination, e.g. `Shift+Ctrl+K`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shortcut {
    modifiers: Modifiers,
    key: String,
}

impl Shortcut {
    /// Normalizes a raw key: single characters are upper-cased, space becomes `Space` and arrow
    /// keys pass through. Anything else has no shortcut.
    pub fn normalize(raw: &str, modifiers: Modifiers) -> Option<Shortcut> {
        let key = if raw == " " || raw == "Space" || raw == "Spacebar" {
            "Space".to_string()
        } else if raw.starts_with("Arrow") {
            raw.to_string()
        } else if raw.chars().count() == 1 {
            raw.to_uppercase()
        } else {
            return None;
        };
        Some(Shortcut { modifiers, key })
    }

    /// Parses a combination such as `ctrl+shift+k`. Modifier names are case insensitive and may
    /// come in any order.
    pub fn parse(combo: &str) -> Result<Shortcut, ShortcutError> {
        let invalid = || ShortcutError::Invalid(combo.to_string());

        // A trailing "++" binds the plus key itself.
        let (prefix, raw) = match combo.strip_suffix("++") {
            Some(prefix) => (Some(prefix), "+"),
            None => match combo.rsplit_once('+') {
                Some((prefix, raw)) => (Some(prefix), raw),
                None => (None, combo),
            },
        };

        let mut modifiers = Modifiers::none();
        for part in prefix.into_iter().flat_map(|p| p.split('+')) {
            match part.trim().to_ascii_lowercase().as_str() {
                "shift" => modifiers.shift = true,
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" | "option" => modifiers.alt = true,
                "meta" | "cmd" | "super" => modifiers.meta = true,
                _ => return Err(invalid()),
            }
        }

        Shortcut::normalize(raw, modifiers).ok_or_else(invalid)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// A reserved key pressed without modifiers.
    pub fn is_reserved(&self) -> bool {
        self.modifiers.is_empty() && RESERVED_KEYS.contains(&self.key.as_str())
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (held, name) in [
            (self.modifiers.shift, "Shift"),
            (self.modifiers.ctrl, "Ctrl"),
            (self.modifiers.alt, "Alt"),
            (self.modifiers.meta, "Meta"),
        ] {
            if held {
                write!(f, "{name}+")?;
            }
        }
        f.write_str(&self.key)
    }
}

/// Bindings that act on the engine or the router rather than a pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalAction {
    StopAll,
    ToggleMute,
    MasterUp,
    MasterDown,
    PreviousBank,
    NextBank,
    StopSelectedBank,
    /// Held back for a future binding.
    Unassigned,
}

impl GlobalAction {
    pub fn for_shortcut(shortcut: &Shortcut) -> Option<GlobalAction> {
        if !shortcut.is_reserved() {
            return None;
        }
        Some(match shortcut.key() {
            "Space" => GlobalAction::StopAll,
            "M" => GlobalAction::ToggleMute,
            "ArrowUp" => GlobalAction::MasterUp,
            "ArrowDown" => GlobalAction::MasterDown,
            "B" => GlobalAction::PreviousBank,
            "N" => GlobalAction::NextBank,
            "Z" => GlobalAction::StopSelectedBank,
            _ => GlobalAction::Unassigned,
        })
    }
}

/// What a user shortcut is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Bank(BankId),
    Pad(PadId),
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Bank(bank) => write!(f, "bank {bank}"),
            Binding::Pad(pad) => write!(f, "pad {pad}"),
        }
    }
}

/// The user shortcuts declared by a bank layout.
#[derive(Debug, Default, Clone)]
pub struct ShortcutMap {
    bindings: HashMap<Shortcut, Binding>,
}

impl ShortcutMap {
    /// Collects the shortcuts of every bank and pad, rejecting invalid, reserved and duplicate
    /// keys.
    pub fn from_banks(banks: &[BankDefinition]) -> Result<ShortcutMap, ShortcutError> {
        let mut map = ShortcutMap::default();
        for bank in banks {
            if let Some(key) = bank.shortcut_key() {
                map.bind(key, Binding::Bank(bank.id().clone()))?;
            }
            for pad in bank.pads() {
                if let Some(key) = pad.shortcut_key() {
                    map.bind(key, Binding::Pad(pad.id().clone()))?;
                }
            }
        }
        Ok(map)
    }

    fn bind(&mut self, key: &str, binding: Binding) -> Result<(), ShortcutError> {
        let shortcut = Shortcut::parse(key)?;
        if shortcut.is_reserved() {
            return Err(ShortcutError::Reserved {
                owner: binding.to_string(),
                key: shortcut.to_string(),
            });
        }
        if let Some(existing) = self.bindings.get(&shortcut) {
            return Err(ShortcutError::Duplicate {
                key: shortcut.to_string(),
                first: existing.to_string(),
                second: binding.to_string(),
            });
        }
        self.bindings.insert(shortcut, binding);
        Ok(())
    }

    pub fn lookup(&self, shortcut: &Shortcut) -> Option<&Binding> {
        self.bindings.get(shortcut)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
