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
use std::time::Duration;

use duration_string::DurationString;
use serde::Deserialize;

use super::ConfigError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A YAML representation of the MIDI surface.
#[derive(Deserialize, Clone, Debug)]
pub struct Midi {
    /// Matched case-insensitively against port names. Names starting with
    /// "mock" select the mock backend.
    device: String,

    poll_interval: Option<String>,
}

impl Midi {
    pub fn new(device: &str, poll_interval: Option<String>) -> Midi {
        Midi {
            device: device.to_string(),
            poll_interval,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Gets how often pending input is drained.
    pub fn poll_interval(&self) -> Result<Duration, ConfigError> {
        self.poll_interval
            .as_ref()
            .map_or(Ok(DEFAULT_POLL_INTERVAL), |duration| {
                Ok(DurationString::from_string(duration.clone())?.into())
            })
    }
}
