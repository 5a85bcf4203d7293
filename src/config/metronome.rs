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
use serde::Deserialize;

use crate::state::Theme;
use crate::tempo::{ParseTimeSignatureError, Tempo, TimeSignature};

const DEFAULT_TEMPO_STEP: u32 = 5;

/// A YAML representation of the starting metronome settings.
#[derive(Deserialize, Clone, Default)]
pub struct Metronome {
    /// The starting tempo. Out of range values are clamped.
    bpm: Option<u32>,

    /// The starting time signature, e.g. "4/4".
    time_signature: Option<String>,

    /// The starting theme.
    theme: Option<Theme>,

    /// How far the faster/slower commands move the tempo.
    tempo_step: Option<u32>,
}

impl Metronome {
    pub fn tempo(&self) -> Tempo {
        self.bpm.map(Tempo::new).unwrap_or_default()
    }

    pub fn time_signature(&self) -> Result<TimeSignature, ParseTimeSignatureError> {
        match &self.time_signature {
            Some(time_signature) => time_signature.parse(),
            None => Ok(TimeSignature::default()),
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme.unwrap_or_default()
    }

    pub fn tempo_step(&self) -> u32 {
        self.tempo_step.unwrap_or(DEFAULT_TEMPO_STEP)
    }
}
