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

use super::ConfigError;
use crate::{
    console::{Layout, PALETTE_SIZE},
    fixture::Color,
};

/// A YAML representation of surface layout overrides.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Surface {
    /// Pad colors, top row first.
    palette: Option<Vec<Color>>,
}

impl Surface {
    /// Builds the layout, starting from the default one.
    pub fn layout(&self) -> Result<Layout, ConfigError> {
        let mut layout = Layout::default();
        if let Some(palette) = &self.palette {
            layout.palette = palette
                .clone()
                .try_into()
                .map_err(|_| ConfigError::Palette {
                    expected: PALETTE_SIZE,
                    actual: palette.len(),
                })?;
        }
        Ok(layout)
    }
}
