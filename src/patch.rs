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
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    config::PatchDocument,
    dmx::universe::UNIVERSE_SIZE,
    fixture::{ChannelRole, Fixture},
};

/// The highest addressable DMX channel.
pub const MAX_CHANNEL: u16 = UNIVERSE_SIZE as u16;

/// Errors produced while patching.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("unknown fixture '{0}'")]
    UnknownFixture(String),

    #[error("invalid channel slot {0}, expected a channel number or -1")]
    InvalidSlot(i32),

    #[error("unknown mode '{0}', expected one of 3CH, 4CH, 5CH, 6CH")]
    UnknownMode(String),
}

const THREE_CHANNEL: [ChannelRole; 3] = [ChannelRole::Red, ChannelRole::Green, ChannelRole::Blue];
const FOUR_CHANNEL: [ChannelRole; 4] = [
    ChannelRole::Red,
    ChannelRole::Green,
    ChannelRole::Blue,
    ChannelRole::Dimmer,
];
const FIVE_CHANNEL: [ChannelRole; 5] = [
    ChannelRole::Red,
    ChannelRole::Green,
    ChannelRole::Blue,
    ChannelRole::Dimmer,
    ChannelRole::Strobe,
];
const SIX_CHANNEL: [ChannelRole; 6] = [
    ChannelRole::Red,
    ChannelRole::Green,
    ChannelRole::Blue,
    ChannelRole::Dimmer,
    ChannelRole::Strobe,
    ChannelRole::Spare,
];

/// A channel mode. Decides which roles of a profile occupy a DMX channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "3CH")]
    Three,
    #[serde(rename = "4CH")]
    Four,
    #[default]
    #[serde(rename = "5CH")]
    Five,
    /// R, G and B on the wire. Dimmer is baked into the color and strobe is
    /// done in software.
    #[serde(rename = "6CH")]
    Six,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Three, Mode::Four, Mode::Five, Mode::Six];

    /// The ordered roles for this mode.
    pub fn profile(&self) -> &'static [ChannelRole] {
        match self {
            Mode::Three => &THREE_CHANNEL,
            Mode::Four => &FOUR_CHANNEL,
            Mode::Five => &FIVE_CHANNEL,
            Mode::Six => &SIX_CHANNEL,
        }
    }

    /// Whether the role exists without a physical channel in this mode.
    pub fn is_virtual(&self, role: ChannelRole) -> bool {
        matches!(self, Mode::Six)
            && matches!(
                role,
                ChannelRole::Dimmer | ChannelRole::Strobe | ChannelRole::Spare
            )
    }

    /// The mode implied by a number of channels.
    pub fn for_len(len: usize) -> Mode {
        match len {
            3 => Mode::Three,
            4 => Mode::Four,
            6 => Mode::Six,
            _ => Mode::Five,
        }
    }

    pub fn for_profile(profile: &[ChannelRole]) -> Mode {
        Mode::for_len(profile.len())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Three => "3CH",
            Mode::Four => "4CH",
            Mode::Five => "5CH",
            Mode::Six => "6CH",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == upper)
            .ok_or_else(|| PatchError::UnknownMode(s.to_string()))
    }
}

/// One entry of a channel map. Serialized as the channel number, or -1 for
/// a virtual role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Slot {
    Physical(u16),
    Virtual,
}

impl Slot {
    pub fn physical(&self) -> Option<u16> {
        match self {
            Slot::Physical(channel) => Some(*channel),
            Slot::Virtual => None,
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, Slot::Virtual)
    }
}

impl TryFrom<i32> for Slot {
    type Error = PatchError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Slot::Virtual),
            channel @ 1..=65535 => Ok(Slot::Physical(channel as u16)),
            other => Err(PatchError::InvalidSlot(other)),
        }
    }
}

impl From<Slot> for i32 {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::Physical(channel) => i32::from(channel),
            Slot::Virtual => -1,
        }
    }
}

/// Fixture id to the channel of each role in its profile.
pub type ChannelMap = BTreeMap<String, Vec<Slot>>;

/// Assigns start addresses sequentially from channel 1. The cursor saturates
/// at the last channel rather than wrapping, so an oversized rig piles up
/// there.
pub fn auto_address(fixtures: &mut [Fixture]) {
    let mut cursor: u16 = 1;
    for fixture in fixtures.iter_mut() {
        fixture.start_address = cursor;
        let len = fixture.channel_profile.len() as u16;
        cursor = cursor.saturating_add(len).min(MAX_CHANNEL);
    }
}

/// Builds the channel map for the given fixtures from their addresses and
/// modes.
pub fn build_channel_map(fixtures: &[Fixture]) -> ChannelMap {
    fixtures
        .iter()
        .map(|fixture| (fixture.id.clone(), fixture_slots(fixture)))
        .collect()
}

fn fixture_slots(fixture: &Fixture) -> Vec<Slot> {
    let mode = fixture.mode();
    let mut next = fixture.start_address;
    fixture
        .channel_profile
        .iter()
        .map(|role| {
            if mode.is_virtual(*role) {
                Slot::Virtual
            } else {
                let slot = Slot::Physical(next);
                next = next.saturating_add(1);
                slot
            }
        })
        .collect()
}

/// Returns the index of every fixture that shares at least one channel with
/// another fixture. Advisory only.
pub fn detect_conflicts(fixtures: &[Fixture]) -> BTreeSet<usize> {
    let mut coverage: Vec<Vec<usize>> = vec![Vec::new(); UNIVERSE_SIZE];
    for (index, fixture) in fixtures.iter().enumerate() {
        if fixture.channel_profile.is_empty() {
            continue;
        }
        let start = usize::from(fixture.start_address.max(1));
        let end = usize::from(fixture.end_address()).min(UNIVERSE_SIZE);
        for channel in start..=end {
            coverage[channel - 1].push(index);
        }
    }

    coverage
        .into_iter()
        .filter(|covering| covering.len() >= 2)
        .flatten()
        .collect()
}

/// Returns the index of every fixture whose range runs past the last channel.
pub fn out_of_range(fixtures: &[Fixture]) -> Vec<usize> {
    fixtures
        .iter()
        .enumerate()
        .filter(|(_, fixture)| fixture.end_address() > MAX_CHANNEL)
        .map(|(index, _)| index)
        .collect()
}

/// Keeps the channel map and the conflict set in step with the fixture list.
#[derive(Debug, Clone)]
pub struct PatchResolver {
    channels: ChannelMap,
    modes: BTreeMap<String, Mode>,
    conflicts: BTreeSet<usize>,
    dirty: bool,
}

impl Default for PatchResolver {
    fn default() -> Self {
        PatchResolver::new()
    }
}

impl PatchResolver {
    /// Creates a resolver that builds its map on the first refresh.
    pub fn new() -> PatchResolver {
        PatchResolver {
            channels: ChannelMap::new(),
            modes: BTreeMap::new(),
            conflicts: BTreeSet::new(),
            dirty: true,
        }
    }

    /// Creates a resolver from a persisted patch document. The document's
    /// channel map is used as is until the patch is next marked dirty. Modes
    /// and start addresses from the document are applied to the matching
    /// fixtures, so a later rebuild reproduces the same addresses.
    pub fn from_document(document: PatchDocument, fixtures: &mut [Fixture]) -> PatchResolver {
        for fixture in fixtures.iter_mut() {
            let slots = document.channels.get(&fixture.id);
            if let Some(start) = slots.and_then(|slots| slots.iter().find_map(Slot::physical)) {
                fixture.start_address = start;
            }

            let mode = match document.modes.get(&fixture.id) {
                Some(mode) => *mode,
                None => match slots {
                    Some(slots) => Mode::for_len(slots.len()),
                    None => continue,
                },
            };
            fixture.channel_profile = mode.profile().to_vec();
        }

        let unpatched = fixtures
            .iter()
            .filter(|fixture| !document.channels.contains_key(&fixture.id))
            .count();
        if unpatched > 0 {
            warn!(
                unpatched,
                "Some fixtures have no entry in the patch document and will not be output."
            );
        }

        let conflicts = detect_conflicts(fixtures);
        if !conflicts.is_empty() {
            warn!(conflicts = ?conflicts, "Address conflicts detected.");
        }

        PatchResolver {
            channels: document.channels,
            modes: document.modes,
            conflicts,
            dirty: false,
        }
    }

    /// The persistable form of the current patch.
    pub fn document(&self) -> PatchDocument {
        PatchDocument {
            channels: self.channels.clone(),
            modes: self.modes.clone(),
        }
    }

    pub fn channel_map(&self) -> &ChannelMap {
        &self.channels
    }

    /// The mode recorded for a fixture, falling back to its profile.
    pub fn mode_of(&self, fixture: &Fixture) -> Mode {
        self.modes
            .get(&fixture.id)
            .copied()
            .unwrap_or_else(|| fixture.mode())
    }

    /// Fixture indices sharing channels as of the last refresh.
    pub fn conflicts(&self) -> &BTreeSet<usize> {
        &self.conflicts
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Rebuilds the channel map and conflict set if the patch is dirty.
    /// Returns true if anything was rebuilt.
    pub fn refresh(&mut self, fixtures: &[Fixture]) -> bool {
        if !self.dirty {
            return false;
        }

        self.channels = build_channel_map(fixtures);
        self.modes = fixtures
            .iter()
            .map(|fixture| (fixture.id.clone(), fixture.mode()))
            .collect();

        let conflicts = detect_conflicts(fixtures);
        if !conflicts.is_empty() && conflicts != self.conflicts {
            warn!(conflicts = ?conflicts, "Address conflicts detected.");
        }
        self.conflicts = conflicts;

        let overflowing = out_of_range(fixtures);
        if !overflowing.is_empty() {
            warn!(fixtures = ?overflowing, "Fixtures extend past channel 512.");
        }

        debug!(fixtures = fixtures.len(), "Rebuilt channel map.");
        self.dirty = false;
        true
    }
}
