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
use super::clip::{ClipError, ClipRef};
use super::pad::PadId;

/// Errors returned synchronously by engine operations. None of them leave partial state behind.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("clip {clip} for pad {pad} is unavailable: {source}")]
    AssetUnavailable {
        pad: PadId,
        clip: ClipRef,
        #[source]
        source: ClipError,
    },

    #[error("unknown pad {0}")]
    InvalidPadReference(PadId),
}
