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
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use ::config::{Environment, File, FileFormat};
use serde::Deserialize;
use tracing::info;

use crate::controller::{Controller, Driver};
use crate::tempo::TimeSignature;
use crate::display;

mod audio;
mod click;
mod error;
mod metronome;

pub use self::audio::Audio;
pub use click::{Click, RotationPolicy};
pub use error::ConfigError;
pub use metronome::Metronome;

/// Environment variables starting with this prefix override file settings,
/// e.g. MTICK_METRONOME__BPM=90.
const ENV_PREFIX: &str = "MTICK";

/// The full configuration. Every section is optional.
#[derive(Deserialize, Clone, Default)]
pub struct Config {
    /// The audio output configuration.
    #[serde(default)]
    audio: Audio,
    /// The click and sound pool configuration.
    #[serde(default)]
    click: Click,
    /// The starting metronome settings.
    #[serde(default)]
    metronome: Metronome,
}

impl Config {
    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn click(&self) -> &Click {
        &self.click
    }

    pub fn metronome(&self) -> &Metronome {
        &self.metronome
    }

    /// Checks the values that can't be expressed in the types alone.
    fn validate(&self) -> Result<(), ConfigError> {
        self.click.validate()?;
        self.metronome.time_signature()?;
        Ok(())
    }
}

/// Settings given on the command line. These win over the file and the
/// environment.
#[derive(Default)]
pub struct Overrides {
    pub bpm: Option<u32>,
    pub time_signature: Option<TimeSignature>,
    pub device: Option<String>,
}

/// Loads the configuration from the optional YAML file, the environment, and
/// the given overrides, in increasing order of priority.
pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Config, ConfigError> {
    let mut builder = ::config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).format(FileFormat::Yaml).required(true));
    }
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    if let Some(bpm) = overrides.bpm {
        builder = builder.set_override("metronome.bpm", i64::from(bpm))?;
    }
    if let Some(time_signature) = overrides.time_signature {
        builder = builder.set_override("metronome.time_signature", time_signature.to_string())?;
    }
    if let Some(device) = &overrides.device {
        builder = builder.set_override("audio.device", device.clone())?;
    }

    let config: Config = builder.build()?.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// Initializes the metronome and controller from the given config file and
/// returns the controller. The controller owns the metronome and runs until the
/// driver sends a quit or closes.
pub fn init_metronome_and_controller(
    path: Option<&Path>,
    overrides: &Overrides,
    driver: Arc<dyn Driver>,
) -> Result<Controller, Box<dyn Error>> {
    let config = load(path, overrides)?;
    let device = crate::audio::get_device(config.audio(), config.click())?;
    info!(device = device.to_string(), "Using audio device.");

    let metronome = crate::metronome::Metronome::new(device, &config)?;
    display::spawn_renderer(metronome.subscribe());

    let controller = Controller::new(metronome, driver)?;
    Ok(controller)
}

#[cfg(test)]
mod test {
    use std::{error::Error, fs, io, path::PathBuf};

    use serial_test::serial;

    use super::*;
    use crate::controller::keyboard;
    use crate::state::Theme;
    use crate::testutil::within;

    fn write_config(dir: &tempfile::TempDir, yaml: &str) -> Result<PathBuf, Box<dyn Error>> {
        let path = dir.path().join("mtick.yaml");
        fs::write(&path, yaml)?;
        Ok(path)
    }

    #[test]
    #[serial]
    fn test_defaults() -> Result<(), Box<dyn Error>> {
        let config = load(None, &Overrides::default())?;
        assert_eq!(config.audio().device(), "default");
        assert_eq!(config.click().pool_size(), 10);
        assert_eq!(config.click().volume(), 1.0);
        assert_eq!(config.click().policy(), RotationPolicy::FreeFirst);
        assert!(config.click().file().is_none());
        assert_eq!(config.metronome().tempo().bpm(), 120);
        assert_eq!(config.metronome().time_signature()?, TimeSignature::FourFour);
        assert_eq!(config.metronome().theme(), Theme::Dark);
        assert_eq!(config.metronome().tempo_step(), 5);
        Ok(())
    }

    #[test]
    #[serial]
    fn test_load_file() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = write_config(
            &dir,
            "audio:
  device: mock-device
click:
  file: /tmp/click.wav
  pool_size: 5
  volume: 0.5
  policy: rotate
metronome:
  bpm: 90
  time_signature: 6/8
  theme: light
  tempo_step: 2
",
        )?;

        let config = load(Some(&path), &Overrides::default())?;
        assert_eq!(config.audio().device(), "mock-device");
        assert_eq!(config.click().pool_size(), 5);
        assert_eq!(config.click().volume(), 0.5);
        assert_eq!(config.click().policy(), RotationPolicy::Rotate);
        assert_eq!(config.click().file(), Some(Path::new("/tmp/click.wav")));
        assert_eq!(config.metronome().tempo().bpm(), 90);
        assert_eq!(config.metronome().time_signature()?, TimeSignature::SixEight);
        assert_eq!(config.metronome().theme(), Theme::Light);
        assert_eq!(config.metronome().tempo_step(), 2);
        Ok(())
    }

    #[test]
    #[serial]
    fn test_overrides_win() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = write_config(
            &dir,
            "audio:\n  device: mock-device\nmetronome:\n  bpm: 90\n",
        )?;

        let overrides = Overrides {
            bpm: Some(150),
            time_signature: Some(TimeSignature::ThreeFour),
            device: Some("mock-other".to_string()),
        };
        let config = load(Some(&path), &overrides)?;
        assert_eq!(config.audio().device(), "mock-other");
        assert_eq!(config.metronome().tempo().bpm(), 150);
        assert_eq!(config.metronome().time_signature()?, TimeSignature::ThreeFour);
        Ok(())
    }

    #[test]
    #[serial]
    fn test_environment_override() -> Result<(), Box<dyn Error>> {
        std::env::set_var("MTICK_METRONOME__BPM", "75");
        let result = load(None, &Overrides::default());
        std::env::remove_var("MTICK_METRONOME__BPM");

        assert_eq!(result?.metronome().tempo().bpm(), 75);
        Ok(())
    }

    #[test]
    #[serial]
    fn test_invalid_values() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;

        let path = write_config(&dir, "metronome:\n  time_signature: 5/3\n")?;
        assert!(matches!(
            load(Some(&path), &Overrides::default()),
            Err(ConfigError::TimeSignature(_))
        ));

        let path = write_config(&dir, "click:\n  pool_size: 0\n")?;
        assert!(matches!(
            load(Some(&path), &Overrides::default()),
            Err(ConfigError::PoolSize(0))
        ));

        let path = write_config(&dir, "click:\n  volume: 1.5\n")?;
        assert!(matches!(
            load(Some(&path), &Overrides::default()),
            Err(ConfigError::Volume(_))
        ));
        Ok(())
    }

    #[test]
    #[serial]
    fn test_missing_file() {
        let result = load(
            Some(Path::new("/nonexistent/mtick.yaml")),
            &Overrides::default(),
        );
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[tokio::test]
    #[serial]
    async fn test_init_metronome_and_controller() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = write_config(&dir, "audio:\n  device: mock-device\nmetronome:\n  bpm: 100\n")?;

        let driver = Arc::new(keyboard::Driver::from_reader(io::Cursor::new(
            "bpm 140\nsig 3/4\nplay\nq\n",
        )));
        let mut controller = init_metronome_and_controller(Some(&path), &Overrides::default(), driver)?;
        within(controller.join(), "Controller never finished").await?;
        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn test_init_rejects_bad_config() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = write_config(&dir, "audio:\n  device: mock-device\nclick:\n  pool_size: 0\n")?;

        let driver = Arc::new(keyboard::Driver::from_reader(io::Cursor::new("")));
        let result = init_metronome_and_controller(Some(&path), &Overrides::default(), driver);
        assert!(result.is_err());
        Ok(())
    }
}
