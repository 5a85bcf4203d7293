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
use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use tracing::debug;

use super::AudioError;

/// How long a mock click sounds for.
const DEFAULT_CLIP_LENGTH: Duration = Duration::from_millis(60);

/// Device names starting with this reject every play request.
const REJECTING_PREFIX: &str = "mock-reject";

/// A mock device. Doesn't actually play anything, but keeps a log of which
/// clip instances were asked to play.
#[derive(Clone)]
pub struct Device {
    name: String,
    clip_length: Duration,
    reject: bool,
    next_clip_id: Arc<Mutex<usize>>,
    plays: Arc<Mutex<Vec<usize>>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device::with_clip_length(name, DEFAULT_CLIP_LENGTH)
    }

    /// Gets a mock device whose clips sound for the given length.
    pub fn with_clip_length(name: &str, clip_length: Duration) -> Device {
        Device {
            name: name.to_string(),
            clip_length,
            reject: name.starts_with(REJECTING_PREFIX),
            next_clip_id: Arc::new(Mutex::new(0)),
            plays: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The IDs of the clips that were played, in order. Rejected plays are
    /// included.
    pub fn plays(&self) -> Vec<usize> {
        self.plays.lock().clone()
    }

    /// The number of play requests received.
    pub fn play_count(&self) -> usize {
        self.plays.lock().len()
    }
}

impl super::Device for Device {
    fn create_clip(&self) -> Result<Box<dyn super::Clip>, AudioError> {
        let mut next_clip_id = self.next_clip_id.lock();
        let id = *next_clip_id;
        *next_clip_id += 1;

        Ok(Box::new(Clip {
            id,
            device: self.name.clone(),
            length: self.clip_length,
            reject: self.reject,
            started: None,
            volume: 1.0,
            plays: self.plays.clone(),
        }))
    }

    fn sample_rate(&self) -> u32 {
        44100
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

/// A mock clip. It counts as sounding until its length has elapsed.
pub struct Clip {
    id: usize,
    device: String,
    length: Duration,
    reject: bool,
    started: Option<Instant>,
    volume: f32,
    plays: Arc<Mutex<Vec<usize>>>,
}

impl super::Clip for Clip {
    fn is_free(&self) -> bool {
        self.started
            .map_or(true, |started| started.elapsed() >= self.length)
    }

    fn rewind(&mut self) {
        self.started = None;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn play(&mut self) -> Result<(), AudioError> {
        self.plays.lock().push(self.id);
        if self.reject {
            return Err(AudioError::Rejected(self.device.clone()));
        }

        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
        debug!(clip = self.id, volume = self.volume, "Mock clip playing.");
        Ok(())
    }
}
