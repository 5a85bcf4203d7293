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
use crate::click::ClipLoadError;

/// Error types for audio output operations
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("No audio device found with name {0}")]
    DeviceNotFound(String),

    #[error("Audio device {0} has no output stream open")]
    NotOpened(String),

    #[error("Audio output stream is unavailable")]
    StreamUnavailable,

    #[error("Playback rejected by {0}")]
    Rejected(String),

    #[error("Unsupported output sample format {0}")]
    UnsupportedSampleFormat(String),

    #[error("The sound pool needs at least one clip")]
    EmptyPool,

    #[error("Audio backend error: {0}")]
    Backend(String),

    #[error("Click clip error: {0}")]
    Clip(#[from] ClipLoadError),
}
