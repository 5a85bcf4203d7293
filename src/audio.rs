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
use std::{error::Error, fmt, sync::Arc};

use crate::config;

pub mod cpal;
pub mod error;
pub mod mock;
mod voice;

pub use error::AudioError;

/// An output device that can hand out playable instances of the click clip.
pub trait Device: fmt::Display + Send + Sync {
    /// Creates a new, independently playable instance of the loaded click. Each
    /// instance has its own playback position.
    fn create_clip(&self) -> Result<Box<dyn Clip>, AudioError>;

    /// The sample rate the device plays at.
    fn sample_rate(&self) -> u32;
}

/// A single playable instance of the click.
pub trait Clip: Send {
    /// Returns true if the clip is not currently sounding: never started,
    /// rewound, or played to the end.
    fn is_free(&self) -> bool;

    /// Moves the playback position back to the start.
    fn rewind(&mut self);

    /// Sets the playback volume (0.0 to 1.0).
    fn set_volume(&mut self, volume: f32);

    /// Starts playback from the current position. Playing a clip that is
    /// already playing keeps it playing.
    fn play(&mut self) -> Result<(), AudioError>;
}

/// Lists output devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Gets the configured device, with the click clip loaded and ready to play.
pub fn get_device(
    audio: &config::Audio,
    click: &config::Click,
) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    let device = audio.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(device)));
    };

    Ok(Arc::new(cpal::Device::get(audio, click)?))
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use super::get_device;
    use crate::config;

    #[test]
    fn test_mock_devices_by_name() -> Result<(), Box<dyn Error>> {
        let click = config::Click::default();

        let device = get_device(&config::Audio::new("mock-device"), &click)?;
        assert_eq!(device.to_string(), "mock-device (Mock)");
        let mut clip = device.create_clip()?;
        assert!(clip.is_free());
        clip.play()?;
        assert!(!clip.is_free());

        let device = get_device(&config::Audio::new("mock-reject"), &click)?;
        assert!(device.create_clip()?.play().is_err());
        Ok(())
    }
}
