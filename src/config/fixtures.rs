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
use serde::Deserialize;

use crate::{
    fixture::{FixtureRegistry, FixtureType, Group},
    patch::{self, Mode},
};

/// A YAML representation of one fixture in the rig.
#[derive(Deserialize, Clone, Debug)]
pub struct Fixture {
    group: Group,
    name: Option<String>,
    fixture_type: Option<FixtureType>,
    mode: Option<Mode>,
    /// Any fixture without an address makes the whole rig auto addressed.
    address: Option<u16>,
}

/// Builds a registry from the configured fixtures.
pub(super) fn registry(fixtures: &[Fixture]) -> FixtureRegistry {
    let mut registry = FixtureRegistry::new();
    for fixture in fixtures {
        registry.add(
            fixture.group,
            fixture.name.clone(),
            fixture.fixture_type.unwrap_or_default(),
            fixture.mode.unwrap_or_default(),
            Some(fixture.address.unwrap_or(1)),
        );
    }

    if fixtures.iter().any(|fixture| fixture.address.is_none()) {
        patch::auto_address(registry.fixtures_mut());
    }
    registry
}
