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

//! Rotating playback over a fixed set of clip instances.

use tracing::{debug, info};

use crate::audio::{AudioError, Clip, Device};
use crate::config::RotationPolicy;

/// A fixed set of clip instances plus a rotation cursor. The set is built once
/// and never resized.
pub struct SoundPool {
    clips: Vec<Box<dyn Clip>>,
    cursor: usize,
    policy: RotationPolicy,
}

impl SoundPool {
    /// Creates a pool over the given clips.
    pub fn new(clips: Vec<Box<dyn Clip>>, policy: RotationPolicy) -> Result<SoundPool, AudioError> {
        if clips.is_empty() {
            return Err(AudioError::EmptyPool);
        }
        Ok(SoundPool {
            clips,
            cursor: 0,
            policy,
        })
    }

    /// Creates `size` clip instances on the device, all at the given volume.
    pub fn from_device(
        device: &dyn Device,
        size: usize,
        volume: f32,
        policy: RotationPolicy,
    ) -> Result<SoundPool, AudioError> {
        let clips = (0..size)
            .map(|_| {
                let mut clip = device.create_clip()?;
                clip.set_volume(volume);
                Ok(clip)
            })
            .collect::<Result<Vec<Box<dyn Clip>>, AudioError>>()?;

        info!(
            device = device.to_string(),
            sample_rate = device.sample_rate(),
            size,
            volume,
            policy = ?policy,
            "Sound pool ready"
        );
        SoundPool::new(clips, policy)
    }

    /// Triggers one click. Picks exactly one instance, rewinds it, and asks it
    /// to play. A rejected play is dropped; the next beat simply tries again.
    /// The cursor advances once per call whatever happens. Returns the index of
    /// the instance that was used.
    pub fn play_click(&mut self) -> usize {
        let index = match self.policy {
            RotationPolicy::FreeFirst => self
                .clips
                .iter()
                .position(|clip| clip.is_free())
                .unwrap_or(self.cursor),
            RotationPolicy::Rotate => self.cursor,
        };

        let clip = &mut self.clips[index];
        clip.rewind();
        if let Err(e) = clip.play() {
            debug!(err = e.to_string(), index, "Click playback rejected");
        }

        self.cursor = (self.cursor + 1) % self.clips.len();
        index
    }

    /// The instance the pool will prefer next.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn policy(&self) -> RotationPolicy {
        self.policy
    }
}

impl std::fmt::Debug for SoundPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundPool")
            .field("size", &self.clips.len())
            .field("cursor", &self.cursor)
            .field("policy", &self.policy)
            .finish()
    }
}
