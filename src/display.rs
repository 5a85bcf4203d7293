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

//! The terminal view. Everything here except the render task is a pure
//! function of a state snapshot and the animation clock.

use std::f64::consts::PI;
use std::io::{self, Write};
use std::time::Duration;

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, span, warn, Instrument, Level};

use crate::state::{Snapshot, Theme};

/// The number of equalizer bars.
pub const BAR_COUNT: usize = 15;

/// How often the equalizer is redrawn while playing.
const FRAME_INTERVAL: Duration = Duration::from_millis(100);

const MIN_BAR_HEIGHT: f64 = 8.0;
const MAX_BAR_HEIGHT: f64 = 88.0;
const WAVE_SPEED: f64 = 2.5;
const WAVE_LENGTH: f64 = 6.0;
const IDLE_INTENSITY: f64 = 0.3;

const BAR_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const LIT_DOT: char = '●';
const UNLIT_DOT: char = '○';

/// One equalizer bar: height in percent and a 0-1 intensity that drives the
/// color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub height: f64,
    pub intensity: f64,
}

/// One dot per beat of the measure. The current beat is lit while playing.
pub fn beat_indicators(snapshot: &Snapshot) -> Vec<bool> {
    (0..snapshot.beats_per_measure)
        .map(|beat| snapshot.playing && beat == snapshot.beat)
        .collect()
}

/// Computes the equalizer bars at the given animation time, in seconds.
pub fn equalizer(snapshot: &Snapshot, time: f64) -> [Bar; BAR_COUNT] {
    let mut bars = [Bar {
        height: 0.0,
        intensity: 0.0,
    }; BAR_COUNT];
    for (index, bar) in bars.iter_mut().enumerate() {
        *bar = if snapshot.playing {
            playing_bar(index, snapshot.tempo.bpm(), time)
        } else {
            idle_bar(index)
        };
    }
    bars
}

/// Returns the bar heights, in percent.
pub fn equalizer_heights(snapshot: &Snapshot, time: f64) -> [f64; BAR_COUNT] {
    equalizer(snapshot, time).map(|bar| bar.height)
}

fn idle_bar(index: usize) -> Bar {
    Bar {
        height: 12.0 + (index as f64 * 0.5).sin() * 8.0,
        intensity: IDLE_INTENSITY,
    }
}

fn playing_bar(index: usize, bpm: u32, time: f64) -> Bar {
    let index = index as f64;
    let traveling = ((time * WAVE_SPEED - index * 0.8) * PI / WAVE_LENGTH).sin();
    let secondary = ((time * WAVE_SPEED * 1.3 + index * 0.6) * PI / (WAVE_LENGTH * 1.5)).sin() * 0.5;
    let pulse = (time * (f64::from(bpm) / 60.0) * PI).sin() * 0.3;

    // Roughly 0-1.
    let wave = (traveling + secondary + pulse) * 0.5 + 0.5;
    let base = 15.0 + (index * 0.3).sin() * 10.0 + index * 1.5;

    Bar {
        height: (base + wave * 45.0).clamp(MIN_BAR_HEIGHT, MAX_BAR_HEIGHT),
        intensity: 0.4 + wave * 0.8,
    }
}

/// The hue of the given bar, running from blue to pink across the equalizer.
pub fn spectrum_hue(index: usize) -> f64 {
    220.0 + (index as f64 / (BAR_COUNT - 1) as f64) * 100.0
}

/// The RGB color of the given bar.
pub fn spectrum_color(index: usize, intensity: f64, theme: Theme) -> (u8, u8, u8) {
    let saturation = (70.0 + intensity * 30.0).min(100.0);
    let lightness = match theme {
        Theme::Dark => 45.0 + intensity * 15.0,
        Theme::Light => 55.0 + intensity * 10.0,
    };
    hsl_to_rgb(spectrum_hue(index), saturation / 100.0, lightness.min(100.0) / 100.0)
}

/// Converts hue (degrees), saturation and lightness (0-1) to RGB.
fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> (u8, u8, u8) {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let sector = (hue.rem_euclid(360.0)) / 60.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    let channel = |value: f64| ((value + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (channel(r), channel(g), channel(b))
}

fn bar_glyph(height: f64) -> char {
    let level = (height / 100.0 * BAR_GLYPHS.len() as f64).floor() as usize;
    BAR_GLYPHS[level.min(BAR_GLYPHS.len() - 1)]
}

/// Draws the status line: beat dots, tempo, time signature and the equalizer.
/// The line is redrawn in place.
pub fn render_to<W: Write>(writer: &mut W, snapshot: &Snapshot, time: f64) -> io::Result<()> {
    write!(writer, "\r\x1b[2K")?;
    for lit in beat_indicators(snapshot) {
        write!(writer, "{} ", if lit { LIT_DOT } else { UNLIT_DOT })?;
    }
    write!(
        writer,
        " {:>3} BPM  {:<4} {} ",
        snapshot.tempo.bpm(),
        snapshot.time_signature,
        if snapshot.playing { "▶" } else { "■" },
    )?;
    for (index, bar) in equalizer(snapshot, time).iter().enumerate() {
        let (r, g, b) = spectrum_color(index, bar.intensity, snapshot.theme);
        write!(writer, "\x1b[38;2;{};{};{}m{}", r, g, b, bar_glyph(bar.height))?;
    }
    write!(writer, "\x1b[0m")?;
    writer.flush()
}

/// Spawns a task that redraws the status line whenever the snapshot changes,
/// and animates the equalizer while playing. The task ends when the metronome
/// goes away.
pub fn spawn_renderer(mut snapshots: watch::Receiver<Snapshot>) -> JoinHandle<()> {
    let span = span!(Level::INFO, "display");
    tokio::spawn(
        async move {
            let start = Instant::now();
            let mut frames = time::interval(FRAME_INTERVAL);
            frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
            debug!("Renderer started.");

            loop {
                let snapshot = *snapshots.borrow_and_update();
                let elapsed = start.elapsed().as_secs_f64();
                if let Err(e) = render_to(&mut io::stdout().lock(), &snapshot, elapsed) {
                    warn!(err = %e, "Unable to draw status line");
                }

                tokio::select! {
                    changed = snapshots.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = frames.tick(), if snapshot.playing => {}
                }
            }

            println!();
            debug!("Renderer finished.");
        }
        .instrument(span),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tempo::{Tempo, TimeSignature};

    fn snapshot(playing: bool, beat: u32) -> Snapshot {
        Snapshot {
            tempo: Tempo::new(120),
            playing,
            beat,
            beats_per_measure: 4,
            time_signature: TimeSignature::FourFour,
            theme: Theme::Dark,
        }
    }

    #[test]
    fn test_beat_indicators() {
        assert_eq!(
            beat_indicators(&snapshot(true, 2)),
            vec![false, false, true, false]
        );
        assert_eq!(beat_indicators(&snapshot(false, 2)), vec![false; 4]);
    }

    #[test]
    fn test_idle_equalizer_is_static() {
        let early = equalizer_heights(&snapshot(false, 0), 0.0);
        let late = equalizer_heights(&snapshot(false, 0), 42.0);
        assert_eq!(early, late);
        assert_eq!(early[0], 12.0);
        for (index, height) in early.iter().enumerate() {
            assert!((height - (12.0 + (index as f64 * 0.5).sin() * 8.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_playing_equalizer_is_bounded_and_moves() {
        let mut moved = false;
        let first = equalizer_heights(&snapshot(true, 0), 0.0);
        for step in 0..200 {
            let heights = equalizer_heights(&snapshot(true, 0), step as f64 * 0.05);
            for height in heights {
                assert!((MIN_BAR_HEIGHT..=MAX_BAR_HEIGHT).contains(&height));
            }
            moved |= heights != first;
        }
        assert!(moved);
    }

    #[test]
    fn test_spectrum() {
        assert_eq!(spectrum_hue(0), 220.0);
        assert_eq!(spectrum_hue(BAR_COUNT - 1), 320.0);

        // Blue-ish at the low end, pink-ish at the high end.
        let (r, _, b) = spectrum_color(0, 0.3, Theme::Dark);
        assert!(b > r);
        let (r, g, _) = spectrum_color(BAR_COUNT - 1, 0.3, Theme::Dark);
        assert!(r > g);
    }

    #[test]
    fn test_hsl_to_rgb() {
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), (255, 0, 0));
        assert_eq!(hsl_to_rgb(120.0, 1.0, 0.5), (0, 255, 0));
        assert_eq!(hsl_to_rgb(240.0, 1.0, 0.5), (0, 0, 255));
        assert_eq!(hsl_to_rgb(0.0, 0.0, 1.0), (255, 255, 255));
    }

    #[test]
    fn test_render() -> io::Result<()> {
        let mut output = Vec::new();
        render_to(&mut output, &snapshot(true, 1), 1.5)?;
        let line = String::from_utf8_lossy(&output);
        assert!(line.starts_with("\r\x1b[2K○ ● ○ ○"));
        assert!(line.contains("120 BPM"));
        assert!(line.contains("4/4"));
        assert!(line.ends_with("\x1b[0m"));
        assert_eq!(line.matches("\x1b[38;2;").count(), BAR_COUNT);
        Ok(())
    }

    #[tokio::test]
    async fn test_renderer_exits_with_metronome() {
        let (sender, receiver) = watch::channel(snapshot(false, 0));
        let handle = spawn_renderer(receiver);
        sender.send_replace(snapshot(false, 0));
        drop(sender);
        crate::testutil::within(handle, "Renderer never finished")
            .await
            .expect("renderer panicked");
    }
}
