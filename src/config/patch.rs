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
use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::ConfigError;
use crate::patch::{ChannelMap, Mode};

/// The persisted patch. Keys are fixture ids and come out sorted, so a load
/// followed by a save reproduces the file. Unknown top level keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchDocument {
    #[serde(default)]
    pub channels: ChannelMap,

    #[serde(default)]
    pub modes: BTreeMap<String, Mode>,
}

impl PatchDocument {
    pub fn load(path: &Path) -> Result<PatchDocument, ConfigError> {
        let document: PatchDocument = serde_json::from_str(&fs::read_to_string(path)?)?;
        info!(
            path = %path.display(),
            fixtures = document.channels.len(),
            "Loaded patch document."
        );
        Ok(document)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        fs::write(path, json)?;
        info!(path = %path.display(), "Saved patch document.");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;
    use crate::patch::Slot;

    const DOCUMENT: &str = r#"{
  "channels": {
    "face_0": [
      1,
      2,
      3,
      4,
      5
    ],
    "lat_1": [
      6,
      7,
      8,
      -1,
      -1,
      -1
    ]
  },
  "modes": {
    "face_0": "5CH",
    "lat_1": "6CH"
  }
}
"#;

    #[test]
    fn test_load_save_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patch.json");
        fs::write(&path, DOCUMENT).unwrap();

        let document = PatchDocument::load(&path).unwrap();
        assert_eq!(Some(&Mode::Six), document.modes.get("lat_1"));
        assert_eq!(
            Some(&vec![
                Slot::Physical(6),
                Slot::Physical(7),
                Slot::Physical(8),
                Slot::Virtual,
                Slot::Virtual,
                Slot::Virtual,
            ]),
            document.channels.get("lat_1")
        );

        document.save(&path).unwrap();
        assert_eq!(DOCUMENT, fs::read_to_string(&path).unwrap());
    }

    #[test]
    fn test_extra_keys_ignored() {
        let document: PatchDocument = serde_json::from_str(
            r#"{"channels": {"face_0": [1, 2, 3]}, "version": 2, "notes": "stage left"}"#,
        )
        .unwrap();
        assert_eq!(1, document.channels.len());
        assert!(document.modes.is_empty());
    }

    #[test]
    fn test_invalid_slot() {
        assert!(serde_json::from_str::<PatchDocument>(r#"{"channels": {"face_0": [0]}}"#).is_err());
        assert!(
            serde_json::from_str::<PatchDocument>(r#"{"modes": {"face_0": "7CH"}}"#).is_err()
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = PatchDocument::load(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
