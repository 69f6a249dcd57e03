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
use crate::controller::shortcuts::ShortcutError;

/// Typed error for config load/parse failures so callers can distinguish
/// e.g. file-not-found from validation errors without string matching.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("bank {0} is defined more than once")]
    DuplicateBank(String),

    #[error("pad {pad} is defined more than once (in bank {bank})")]
    DuplicatePad { bank: String, pad: String },

    #[error("pad {pad} has volume {volume}, expected a value between 0 and 1")]
    InvalidVolume { pad: String, volume: f32 },

    #[error("master volume {0} is out of range, expected a value between 0 and 1")]
    InvalidMasterVolume(f32),

    #[error("invalid duration for {field}: {value}")]
    InvalidDuration { field: &'static str, value: String },

    #[error(transparent)]
    Shortcut(#[from] ShortcutError),
}
