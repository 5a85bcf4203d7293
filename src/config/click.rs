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
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ConfigError;

const DEFAULT_POOL_SIZE: usize = 10;
const DEFAULT_VOLUME: f32 = 1.0;

/// How the sound pool picks the instance for the next click.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RotationPolicy {
    /// Use the first instance that isn't playing. If every instance is busy,
    /// retrigger the one at the cursor.
    #[default]
    FreeFirst,
    /// Always use the instance at the cursor.
    Rotate,
}

/// A YAML representation of the click configuration.
#[derive(Deserialize, Clone, Default)]
pub struct Click {
    /// An audio file to use instead of the bundled click.
    file: Option<PathBuf>,

    /// The number of clip instances in the sound pool (default: 10).
    pool_size: Option<usize>,

    /// The click volume, 0.0 to 1.0 (default: 1.0).
    volume: Option<f32>,

    /// The pool rotation policy (default: free_first).
    policy: Option<RotationPolicy>,
}

impl Click {
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size.unwrap_or(DEFAULT_POOL_SIZE)
    }

    pub fn volume(&self) -> f32 {
        self.volume.unwrap_or(DEFAULT_VOLUME)
    }

    pub fn policy(&self) -> RotationPolicy {
        self.policy.unwrap_or_default()
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size() == 0 {
            return Err(ConfigError::PoolSize(0));
        }
        let volume = self.volume();
        if !(0.0..=1.0).contains(&volume) {
            return Err(ConfigError::Volume(volume));
        }
        Ok(())
    }
}
