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
use std::{net::Ipv4Addr, time::Duration};

use duration_string::DurationString;
use serde::Deserialize;

use super::ConfigError;
use crate::dmx::artnet::ARTNET_PORT;

pub const DEFAULT_TARGET_IP: Ipv4Addr = Ipv4Addr::new(2, 0, 0, 15);
pub const DEFAULT_UNIVERSE: u16 = 0;
/// 25 frames a second.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(40);

/// A YAML representation of the Art-Net output.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct ArtNet {
    /// The node to send to. Usually a broadcast or 2.x.x.x address.
    target_ip: Option<String>,

    target_port: Option<u16>,

    universe: Option<u16>,

    /// How often a frame is sent.
    interval: Option<String>,
}

impl ArtNet {
    /// Gets the target address.
    pub fn target_ip(&self) -> Result<Ipv4Addr, ConfigError> {
        Ok(match &self.target_ip {
            Some(ip) => ip.parse()?,
            None => DEFAULT_TARGET_IP,
        })
    }

    pub fn target_port(&self) -> u16 {
        self.target_port.unwrap_or(ARTNET_PORT)
    }

    pub fn universe(&self) -> u16 {
        self.universe.unwrap_or(DEFAULT_UNIVERSE)
    }

    /// Gets the DMX tick interval.
    pub fn interval(&self) -> Result<Duration, ConfigError> {
        self.interval
            .as_ref()
            .map_or(Ok(DEFAULT_INTERVAL), |duration| {
                Ok(DurationString::from_string(duration.clone())?.into())
            })
    }
}
