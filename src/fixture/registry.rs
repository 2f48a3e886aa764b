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
use tracing::info;

use super::{Color, Fixture, FixtureType, Group};
use crate::patch::{self, Mode, PatchError, MAX_CHANNEL};

/// The rig created by reset-to-defaults.
pub const DEFAULT_RIG: [(Group, usize); 6] = [
    (Group::Face, 4),
    (Group::Douche1, 3),
    (Group::Douche2, 3),
    (Group::Douche3, 3),
    (Group::Lat, 2),
    (Group::Contre, 6),
];

/// An edit against the fixture list.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    Add {
        group: Group,
        name: Option<String>,
        fixture_type: FixtureType,
        mode: Mode,
        /// When absent the fixture goes to the next free address.
        address: Option<u16>,
    },
    Remove {
        id: String,
    },
    Rename {
        id: String,
        name: String,
    },
    SetGroup {
        id: String,
        group: Group,
    },
    SetType {
        id: String,
        fixture_type: FixtureType,
    },
    SetAddress {
        id: String,
        address: u16,
    },
    SetProfile {
        id: String,
        mode: Mode,
    },
    SetLevel {
        id: String,
        level: u8,
    },
    SetBaseColor {
        id: String,
        color: Color,
    },
    SetMuted {
        id: String,
        muted: bool,
    },
    ResetDefaults,
    AutoAddress,
}

/// What an edit changed, from the output stage's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Delta {
    /// Nothing that reaches the wire changed.
    Unchanged,
    /// Fixture output changed, the channel map is still valid.
    Output,
    /// Addresses or profiles changed, the channel map must be rebuilt.
    Patch,
}

impl Delta {
    /// Combines two deltas, keeping the stronger one.
    pub fn merge(self, other: Delta) -> Delta {
        self.max(other)
    }
}

/// Owns the list of fixtures. Iteration order is patch order.
#[derive(Debug, Clone, Default)]
pub struct FixtureRegistry {
    fixtures: Vec<Fixture>,
    next_index: usize,
}

impl FixtureRegistry {
    /// Creates an empty registry.
    pub fn new() -> FixtureRegistry {
        FixtureRegistry::default()
    }

    /// Creates a registry holding the default rig.
    pub fn with_defaults() -> FixtureRegistry {
        let mut registry = FixtureRegistry::new();
        registry.reset_defaults();
        registry
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    pub fn fixtures_mut(&mut self) -> &mut [Fixture] {
        &mut self.fixtures
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Fixture> {
        self.fixtures.iter().find(|fixture| fixture.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Fixture> {
        self.fixtures.iter_mut().find(|fixture| fixture.id == id)
    }

    /// Every fixture whose group is in the given list.
    pub fn in_groups<'a>(
        &'a mut self,
        groups: &'a [Group],
    ) -> impl Iterator<Item = &'a mut Fixture> + 'a {
        self.fixtures
            .iter_mut()
            .filter(move |fixture| groups.contains(&fixture.group))
    }

    /// Adds a fixture and returns its id.
    pub fn add(
        &mut self,
        group: Group,
        name: Option<String>,
        fixture_type: FixtureType,
        mode: Mode,
        address: Option<u16>,
    ) -> String {
        let id = format!("{}_{}", group.key(), self.next_index);
        self.next_index += 1;

        let name = name.unwrap_or_else(|| {
            let in_group = self.fixtures.iter().filter(|f| f.group == group).count();
            format!("{} {}", group.label(), in_group + 1)
        });
        let address = address.unwrap_or_else(|| self.next_free_address());

        let mut fixture = Fixture::new(id.clone(), group, name, fixture_type, mode);
        fixture.start_address = address.clamp(1, MAX_CHANNEL);
        self.fixtures.push(fixture);
        id
    }

    /// The address after the highest channel currently in use.
    pub fn next_free_address(&self) -> u16 {
        self.fixtures
            .iter()
            .map(|fixture| fixture.end_address().saturating_add(1))
            .max()
            .unwrap_or(1)
            .min(MAX_CHANNEL)
    }

    /// Replaces the fixture list with the default rig, auto addressed.
    pub fn reset_defaults(&mut self) {
        self.fixtures.clear();
        self.next_index = 0;
        for (group, count) in DEFAULT_RIG {
            for _ in 0..count {
                self.add(group, None, FixtureType::ParLed, Mode::Five, Some(1));
            }
        }
        patch::auto_address(&mut self.fixtures);
        info!(fixtures = self.fixtures.len(), "Reset to the default rig.");
    }

    /// Applies an edit and reports what it changed.
    pub fn apply(&mut self, edit: Edit) -> Result<Delta, PatchError> {
        match edit {
            Edit::Add {
                group,
                name,
                fixture_type,
                mode,
                address,
            } => {
                let id = self.add(group, name, fixture_type, mode, address);
                info!(id, "Added fixture.");
                Ok(Delta::Patch)
            }
            Edit::Remove { id } => {
                let position = self
                    .fixtures
                    .iter()
                    .position(|fixture| fixture.id == id)
                    .ok_or_else(|| PatchError::UnknownFixture(id.clone()))?;
                self.fixtures.remove(position);
                info!(id, "Removed fixture.");
                Ok(Delta::Patch)
            }
            Edit::Rename { id, name } => {
                self.fixture_mut(&id)?.name = name;
                Ok(Delta::Unchanged)
            }
            Edit::SetGroup { id, group } => {
                self.fixture_mut(&id)?.group = group;
                Ok(Delta::Unchanged)
            }
            Edit::SetType { id, fixture_type } => {
                self.fixture_mut(&id)?.fixture_type = fixture_type;
                Ok(Delta::Unchanged)
            }
            Edit::SetAddress { id, address } => {
                self.fixture_mut(&id)?.start_address = address.clamp(1, MAX_CHANNEL);
                Ok(Delta::Patch)
            }
            Edit::SetProfile { id, mode } => {
                self.fixture_mut(&id)?.channel_profile = mode.profile().to_vec();
                Ok(Delta::Patch)
            }
            Edit::SetLevel { id, level } => {
                self.fixture_mut(&id)?.set_level(level);
                Ok(Delta::Output)
            }
            Edit::SetBaseColor { id, color } => {
                self.fixture_mut(&id)?.set_base_color(color);
                Ok(Delta::Output)
            }
            Edit::SetMuted { id, muted } => {
                self.fixture_mut(&id)?.muted = muted;
                Ok(Delta::Output)
            }
            Edit::ResetDefaults => {
                self.reset_defaults();
                Ok(Delta::Patch)
            }
            Edit::AutoAddress => {
                patch::auto_address(&mut self.fixtures);
                Ok(Delta::Patch)
            }
        }
    }

    fn fixture_mut(&mut self, id: &str) -> Result<&mut Fixture, PatchError> {
        self.get_mut(id)
            .ok_or_else(|| PatchError::UnknownFixture(id.to_string()))
    }
}
