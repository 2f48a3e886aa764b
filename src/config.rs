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

use config::{Config, File, FileFormat};
use serde::Deserialize;
use tracing::info;

use crate::{
    console::Layout,
    fixture::{Fixture, FixtureRegistry},
    patch::PatchResolver,
};

mod artnet;
mod error;
mod fixtures;
mod midi;
mod patch;
mod surface;

pub use artnet::ArtNet;
pub use error::ConfigError;
pub use midi::{Midi, DEFAULT_POLL_INTERVAL};
pub use patch::PatchDocument;
pub use surface::Surface;

/// The top level YAML configuration.
#[derive(Deserialize, Clone, Debug)]
pub struct Padlight {
    #[serde(default)]
    artnet: ArtNet,

    /// Absent means the surface is disabled.
    midi: Option<Midi>,

    /// Where the patch document lives. Relative paths are relative to the
    /// config file.
    patch_file: Option<PathBuf>,

    /// Absent means the default rig.
    fixtures: Option<Vec<fixtures::Fixture>>,

    #[serde(default)]
    surface: Surface,
}

impl Padlight {
    /// Loads the configuration from a file. The format follows the extension.
    pub fn load(path: &Path) -> Result<Padlight, ConfigError> {
        let mut padlight: Padlight = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;

        if let (Some(patch_file), Some(dir)) = (padlight.patch_file.as_mut(), path.parent()) {
            if patch_file.is_relative() {
                *patch_file = dir.join(&patch_file);
            }
        }

        info!(path = %path.display(), "Loaded configuration.");
        Ok(padlight)
    }

    /// Parses the configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Padlight, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?)
    }

    pub fn artnet(&self) -> &ArtNet {
        &self.artnet
    }

    pub fn midi(&self) -> Option<&Midi> {
        self.midi.as_ref()
    }

    pub fn patch_file(&self) -> Option<&Path> {
        self.patch_file.as_deref()
    }

    /// Builds the fixture registry.
    pub fn registry(&self) -> FixtureRegistry {
        match &self.fixtures {
            Some(entries) => fixtures::registry(entries),
            None => FixtureRegistry::with_defaults(),
        }
    }

    /// Builds the patch resolver. An existing patch document is loaded and
    /// applied to the fixtures, otherwise the patch is derived from them.
    pub fn patch(&self, fixtures: &mut [Fixture]) -> Result<PatchResolver, ConfigError> {
        match self.patch_file() {
            Some(path) if path.exists() => Ok(PatchResolver::from_document(
                PatchDocument::load(path)?,
                fixtures,
            )),
            _ => Ok(PatchResolver::new()),
        }
    }

    pub fn layout(&self) -> Result<Layout, ConfigError> {
        self.surface.layout()
    }
}
