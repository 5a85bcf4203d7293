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

//! Tempo and time signature types.

use std::{fmt, str::FromStr, time::Duration};

/// The slowest tempo the metronome will play.
pub const MIN_BPM: u32 = 40;
/// The fastest tempo the metronome will play.
pub const MAX_BPM: u32 = 200;
/// The tempo used when nothing else is configured.
pub const DEFAULT_BPM: u32 = 120;

/// Beats per measure used for signatures that aren't recognized.
const DEFAULT_BEATS_PER_MEASURE: u32 = 4;

/// A tempo in beats per minute, always within [MIN_BPM, MAX_BPM].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tempo(u32);

impl Tempo {
    /// Creates a new tempo, clamping the given BPM into the supported range.
    pub fn new(bpm: u32) -> Tempo {
        Tempo(bpm.clamp(MIN_BPM, MAX_BPM))
    }

    /// Returns the tempo in beats per minute.
    pub fn bpm(&self) -> u32 {
        self.0
    }

    /// Returns the tick interval in milliseconds (60000 / BPM).
    pub fn interval_ms(&self) -> f64 {
        60_000.0 / self.0 as f64
    }

    /// Returns the tick interval.
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(60.0 / self.0 as f64)
    }

    /// Returns a tempo offset by the given number of BPM, clamped into range.
    pub fn offset(&self, delta: i32) -> Tempo {
        Tempo::new(self.0.saturating_add_signed(delta))
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Tempo(DEFAULT_BPM)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.0)
    }
}

/// Returned when a time signature string is not one of the supported signatures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported time signature '{0}'")]
pub struct ParseTimeSignatureError(String);

/// The supported time signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimeSignature {
    TwoFour,
    ThreeFour,
    #[default]
    FourFour,
    FiveFour,
    SixEight,
    SevenEight,
    NineEight,
    TwelveEight,
}

impl TimeSignature {
    /// All supported signatures, in the order they are offered to the user.
    pub const ALL: [TimeSignature; 8] = [
        TimeSignature::TwoFour,
        TimeSignature::ThreeFour,
        TimeSignature::FourFour,
        TimeSignature::FiveFour,
        TimeSignature::SixEight,
        TimeSignature::SevenEight,
        TimeSignature::NineEight,
        TimeSignature::TwelveEight,
    ];

    /// The number of beats in a measure (the top number).
    pub fn beats_per_measure(&self) -> u32 {
        match self {
            TimeSignature::TwoFour => 2,
            TimeSignature::ThreeFour => 3,
            TimeSignature::FourFour => 4,
            TimeSignature::FiveFour => 5,
            TimeSignature::SixEight => 6,
            TimeSignature::SevenEight => 7,
            TimeSignature::NineEight => 9,
            TimeSignature::TwelveEight => 12,
        }
    }

    /// The signature as written, e.g. "6/8".
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSignature::TwoFour => "2/4",
            TimeSignature::ThreeFour => "3/4",
            TimeSignature::FourFour => "4/4",
            TimeSignature::FiveFour => "5/4",
            TimeSignature::SixEight => "6/8",
            TimeSignature::SevenEight => "7/8",
            TimeSignature::NineEight => "9/8",
            TimeSignature::TwelveEight => "12/8",
        }
    }
}

impl FromStr for TimeSignature {
    type Err = ParseTimeSignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        TimeSignature::ALL
            .into_iter()
            .find(|signature| signature.as_str() == trimmed)
            .ok_or_else(|| ParseTimeSignatureError(trimmed.to_string()))
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Looks up the beats per measure for a signature string. Unrecognized
/// signatures count as four beats.
pub fn beats_per_measure_for(signature: &str) -> u32 {
    signature
        .parse::<TimeSignature>()
        .map(|signature| signature.beats_per_measure())
        .unwrap_or(DEFAULT_BEATS_PER_MEASURE)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_interval_for_every_tempo() {
        for bpm in MIN_BPM..=MAX_BPM {
            let tempo = Tempo::new(bpm);
            let expected = 60_000.0 / bpm as f64;
            assert!((tempo.interval_ms() - expected).abs() < 1e-9);
            assert!((tempo.interval().as_secs_f64() * 1000.0 - expected).abs() < 1e-6);
        }
        assert_eq!(Tempo::new(120).interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_tempo_clamps() {
        assert_eq!(Tempo::new(0).bpm(), MIN_BPM);
        assert_eq!(Tempo::new(39).bpm(), MIN_BPM);
        assert_eq!(Tempo::new(201).bpm(), MAX_BPM);
        assert_eq!(Tempo::new(150).bpm(), 150);
        assert_eq!(Tempo::default().bpm(), DEFAULT_BPM);
    }

    #[test]
    fn test_tempo_offset() {
        assert_eq!(Tempo::new(120).offset(5).bpm(), 125);
        assert_eq!(Tempo::new(120).offset(-5).bpm(), 115);
        assert_eq!(Tempo::new(198).offset(5).bpm(), MAX_BPM);
        assert_eq!(Tempo::new(42).offset(-5).bpm(), MIN_BPM);
    }

    #[test]
    fn test_beats_per_measure_table() {
        let expected = [
            ("2/4", 2),
            ("3/4", 3),
            ("4/4", 4),
            ("5/4", 5),
            ("6/8", 6),
            ("7/8", 7),
            ("9/8", 9),
            ("12/8", 12),
        ];
        for (signature, beats) in expected {
            assert_eq!(beats_per_measure_for(signature), beats, "{}", signature);
            let parsed: TimeSignature = signature.parse().unwrap();
            assert_eq!(parsed.beats_per_measure(), beats);
            assert_eq!(parsed.to_string(), signature);
        }
    }

    #[test]
    fn test_unrecognized_signature() {
        assert_eq!(beats_per_measure_for("13/16"), 4);
        assert_eq!(beats_per_measure_for(""), 4);
        assert_eq!(
            "3/3".parse::<TimeSignature>(),
            Err(ParseTimeSignatureError("3/3".to_string()))
        );
    }
}
