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
use std::{fmt, str::FromStr};

use serde::Deserialize;

use crate::tempo::{Tempo, TimeSignature};

/// The display palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    /// Returns the other theme.
    pub fn toggled(&self) -> Theme {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!("unknown theme '{}'", other)),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Dark => f.write_str("dark"),
            Theme::Light => f.write_str("light"),
        }
    }
}

/// The whole of the metronome's user-visible state. All changes go through the
/// named transitions below.
#[derive(Debug, Clone)]
pub struct MetronomeState {
    tempo: Tempo,
    playing: bool,
    beat: u32,
    theme: Theme,
    time_signature: TimeSignature,
    /// Incremented every time the beat timer is (re)armed or torn down. Ticks
    /// carry the epoch they were armed with and are dropped if it has moved on.
    epoch: u64,
}

/// A copy of the state handed to the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub tempo: Tempo,
    pub playing: bool,
    pub beat: u32,
    pub beats_per_measure: u32,
    pub time_signature: TimeSignature,
    pub theme: Theme,
}

impl MetronomeState {
    pub fn new(tempo: Tempo, time_signature: TimeSignature, theme: Theme) -> MetronomeState {
        MetronomeState {
            tempo,
            playing: false,
            beat: 0,
            theme,
            time_signature,
            epoch: 0,
        }
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn beat(&self) -> u32 {
        self.beat
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    pub fn beats_per_measure(&self) -> u32 {
        self.time_signature.beats_per_measure()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Sets the tempo. Returns true if the value changed.
    pub fn set_tempo(&mut self, tempo: Tempo) -> bool {
        if self.tempo == tempo {
            return false;
        }
        self.tempo = tempo;
        true
    }

    /// Flips between playing and stopped. Starting resets the beat to zero.
    /// Returns the new playing flag.
    pub fn toggle_play(&mut self) -> bool {
        self.playing = !self.playing;
        if self.playing {
            self.beat = 0;
        }
        self.playing
    }

    /// Stops playback if playing. Returns true if the state changed.
    pub fn stop(&mut self) -> bool {
        if !self.playing {
            return false;
        }
        self.playing = false;
        true
    }

    /// Changes the time signature and resets the beat to zero.
    pub fn set_time_signature(&mut self, time_signature: TimeSignature) {
        self.time_signature = time_signature;
        self.beat = 0;
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    /// Advances the beat by one, wrapping at the end of the measure.
    pub fn advance_beat(&mut self) -> u32 {
        self.beat = (self.beat + 1) % self.beats_per_measure();
        self.beat
    }

    /// Moves to a new timer epoch and returns it.
    pub fn next_epoch(&mut self) -> u64 {
        self.epoch = self.epoch.wrapping_add(1);
        self.epoch
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tempo: self.tempo,
            playing: self.playing,
            beat: self.beat,
            beats_per_measure: self.beats_per_measure(),
            time_signature: self.time_signature,
            theme: self.theme,
        }
    }
}

impl Default for MetronomeState {
    fn default() -> Self {
        MetronomeState::new(Tempo::default(), TimeSignature::default(), Theme::default())
    }
}
