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

//! Lock-free voices shared between clip handles and the output callback.
//!
//! The clip handle only ever rewinds, starts, or re-levels a voice. The output
//! callback is the only writer that advances the position or marks the voice as
//! ended, so neither side ever blocks the other.

use std::sync::{
    atomic::{AtomicU32, AtomicU64, Ordering},
    Arc,
};

/// Set in the voice state while the voice should produce sound. The remaining
/// bits hold the playback position.
const PLAYING: u64 = 1 << 63;
const POSITION_MASK: u64 = PLAYING - 1;

/// One playback position over the shared click data.
pub struct Voice {
    /// The mono click samples at the device sample rate.
    data: Arc<[f32]>,
    /// The playing flag and the next sample to play, updated together so a
    /// retrigger can't be lost to the callback marking the voice as ended.
    state: AtomicU64,
    /// The volume, stored as f32 bits.
    volume: AtomicU32,
}

impl Voice {
    pub fn new(data: Arc<[f32]>) -> Voice {
        Voice {
            data,
            state: AtomicU64::new(0),
            volume: AtomicU32::new(1.0f32.to_bits()),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state.load(Ordering::Acquire) & PLAYING != 0
    }

    pub fn position(&self) -> usize {
        (self.state.load(Ordering::Acquire) & POSITION_MASK) as usize
    }

    /// Moves the position back to the start, keeping the playing flag.
    pub fn rewind(&self) {
        self.state.fetch_and(PLAYING, Ordering::AcqRel);
    }

    pub fn start(&self) {
        self.state.fetch_or(PLAYING, Ordering::AcqRel);
    }

    pub fn set_volume(&self, volume: f32) {
        self.volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }

    /// Adds the next `output.len()` samples of this voice into the output.
    /// Marks the voice as ended once the data runs out.
    pub fn mix_into(&self, output: &mut [f32]) {
        let observed = self.state.load(Ordering::Acquire);
        if observed & PLAYING == 0 {
            return;
        }

        let start = ((observed & POSITION_MASK) as usize).min(self.data.len());
        let count = output.len().min(self.data.len() - start);
        let volume = self.volume();
        for (out, sample) in output.iter_mut().zip(&self.data[start..start + count]) {
            *out += sample * volume;
        }

        self.advance(observed, start + count);
    }

    /// Moves the position to `end` if nothing touched the voice since
    /// `observed` was loaded, clearing the playing flag at the end of the data.
    /// A rewind or start in between wins.
    fn advance(&self, observed: u64, end: usize) {
        let mut next = end as u64 & POSITION_MASK;
        if end < self.data.len() {
            next |= PLAYING;
        }
        let _ = self
            .state
            .compare_exchange(observed, next, Ordering::AcqRel, Ordering::Acquire);
    }
}
