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
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::patch::Mode;

mod color;
mod registry;

pub use color::{Color, ColorError};
pub use registry::{Delta, Edit, FixtureRegistry};

/// The category a fixture belongs to. Faders address fixtures by group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Face,
    Douche1,
    Douche2,
    Douche3,
    Lat,
    Contre,
    Custom,
}

impl Group {
    pub const ALL: [Group; 7] = [
        Group::Face,
        Group::Douche1,
        Group::Douche2,
        Group::Douche3,
        Group::Lat,
        Group::Contre,
        Group::Custom,
    ];

    /// The key used in fixture ids.
    pub fn key(&self) -> &'static str {
        match self {
            Group::Face => "face",
            Group::Douche1 => "douche1",
            Group::Douche2 => "douche2",
            Group::Douche3 => "douche3",
            Group::Lat => "lat",
            Group::Contre => "contre",
            Group::Custom => "custom",
        }
    }

    /// A human readable label, used for default fixture names.
    pub fn label(&self) -> &'static str {
        match self {
            Group::Face => "Face",
            Group::Douche1 => "Douche 1",
            Group::Douche2 => "Douche 2",
            Group::Douche3 => "Douche 3",
            Group::Lat => "Lat",
            Group::Contre => "Contre",
            Group::Custom => "Custom",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Group {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Group::ALL
            .into_iter()
            .find(|group| group.key() == lower)
            .ok_or_else(|| format!("unknown fixture group '{}'", s))
    }
}

/// The kind of instrument. Informational only, output does not depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FixtureType {
    #[default]
    #[serde(rename = "PAR LED")]
    ParLed,
    #[serde(rename = "Moving Head")]
    MovingHead,
    #[serde(rename = "Barre LED")]
    BarreLed,
    #[serde(rename = "Stroboscope")]
    Stroboscope,
    #[serde(rename = "Smoke Machine")]
    SmokeMachine,
}

impl fmt::Display for FixtureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FixtureType::ParLed => "PAR LED",
            FixtureType::MovingHead => "Moving Head",
            FixtureType::BarreLed => "Barre LED",
            FixtureType::Stroboscope => "Stroboscope",
            FixtureType::SmokeMachine => "Smoke Machine",
        })
    }
}

/// The logical role of one channel in a fixture's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    Red,
    Green,
    Blue,
    Dimmer,
    Strobe,
    Spare,
}

/// How the output stage treats a fixture's strobe role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DmxMode {
    #[default]
    Manual,
    Strobe,
}

/// One controllable light.
#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    pub id: String,
    pub group: Group,
    pub name: String,
    pub fixture_type: FixtureType,
    pub start_address: u16,
    pub channel_profile: Vec<ChannelRole>,
    /// Dimmer intent, 0..=100.
    pub level: u8,
    pub base_color: Color,
    /// What the output stage reads. Derived from base color and level unless
    /// an effect is overriding it.
    pub color: Color,
    pub muted: bool,
    pub dmx_mode: DmxMode,
}

impl Fixture {
    pub fn new(
        id: String,
        group: Group,
        name: String,
        fixture_type: FixtureType,
        mode: Mode,
    ) -> Fixture {
        Fixture {
            id,
            group,
            name,
            fixture_type,
            start_address: 1,
            channel_profile: mode.profile().to_vec(),
            level: 0,
            base_color: Color::WHITE,
            color: Color::BLACK,
            muted: false,
            dmx_mode: DmxMode::Manual,
        }
    }

    /// Sets the dimmer intent and recomputes the displayed color.
    pub fn set_level(&mut self, level: u8) {
        self.level = level.min(100);
        self.refresh_color();
    }

    /// Sets the base color and recomputes the displayed color.
    pub fn set_base_color(&mut self, color: Color) {
        self.base_color = color;
        self.refresh_color();
    }

    /// The base color scaled by the current level.
    pub fn scaled_base(&self) -> Color {
        self.base_color.scale(f64::from(self.level) / 100.0)
    }

    pub fn refresh_color(&mut self) {
        self.color = self.scaled_base();
    }

    pub fn is_lit(&self) -> bool {
        self.level > 0
    }

    /// The mode implied by the channel profile.
    pub fn mode(&self) -> Mode {
        Mode::for_profile(&self.channel_profile)
    }

    /// The last channel covered by this fixture. May exceed 512, in which case
    /// the fixture is flagged but still patched.
    pub fn end_address(&self) -> u16 {
        let len = self.channel_profile.len().max(1) as u16;
        self.start_address.saturating_add(len - 1)
    }

    pub fn snapshot(&self) -> FixtureSnapshot {
        FixtureSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            level: self.level,
            color: self.color,
            muted: self.muted,
        }
    }
}

/// The display view of a fixture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixtureSnapshot {
    pub id: String,
    pub name: String,
    pub level: u8,
    pub color: Color,
    pub muted: bool,
}

#[cfg(test)]
mod test {
    use super::*;

    fn par(mode: Mode) -> Fixture {
        Fixture::new(
            "face_0".to_string(),
            Group::Face,
            "Face 1".to_string(),
            FixtureType::ParLed,
            mode,
        )
    }

    #[test]
    fn test_level_scales_color() {
        let mut fixture = par(Mode::Five);
        fixture.set_base_color(Color::new(255, 0, 0));
        assert_eq!(Color::BLACK, fixture.color);

        fixture.set_level(50);
        assert_eq!(Color::new(127, 0, 0), fixture.color);
        assert!(fixture.is_lit());

        fixture.set_level(200);
        assert_eq!(100, fixture.level);
        assert_eq!(Color::new(255, 0, 0), fixture.color);
    }

    #[test]
    fn test_end_address() {
        let mut fixture = par(Mode::Five);
        fixture.start_address = 10;
        assert_eq!(14, fixture.end_address());

        let mut fixture = par(Mode::Six);
        fixture.start_address = 510;
        assert_eq!(515, fixture.end_address());
        assert_eq!(Mode::Six, fixture.mode());
    }

    #[test]
    fn test_group_parse() {
        assert_eq!(Ok(Group::Douche2), "Douche2".parse::<Group>());
        assert_eq!(Ok(Group::Contre), "contre".parse::<Group>());
        assert!("fumee".parse::<Group>().is_err());
        assert_eq!("lat", Group::Lat.to_string());
    }
}
