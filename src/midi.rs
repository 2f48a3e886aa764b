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
use std::fmt;

mod bridge;
mod midir;
mod mock;
mod velocity;

pub use bridge::{decode, encode, pad_note, set_pad_led, MidiBridge, SurfaceInput};
pub use mock::{MockBackend, MockPort};
pub use velocity::rgb_to_akai_velocity;

#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    #[error("unable to initialize MIDI: {0}")]
    Init(#[from] ::midir::InitError),

    #[error("unable to read MIDI port info: {0}")]
    PortInfo(#[from] ::midir::PortInfoError),

    #[error("no MIDI port matches '{0}'")]
    NoMatchingPort(String),

    #[error("unable to connect to MIDI port: {0}")]
    Connect(String),

    #[error("unable to send MIDI message: {0}")]
    Send(String),
}

/// A MIDI port pair, open for input and output. Dropping the port closes it.
pub trait Port {
    /// Returns the name of the port.
    fn name(&self) -> &str;

    /// Sends one raw message.
    fn send(&mut self, message: &[u8]) -> Result<(), MidiError>;

    /// Takes the next pending input message, if any. Never blocks.
    fn receive(&mut self) -> Option<Vec<u8>>;
}

/// A port as seen when listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub input: bool,
    pub output: bool,
}

impl fmt::Display for PortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut capabilities: Vec<&str> = Vec::new();
        if self.input {
            capabilities.push("Input");
        }
        if self.output {
            capabilities.push("Output");
        }

        write!(f, "{} ({})", self.name, capabilities.join("/"))
    }
}

/// A source of MIDI ports.
pub trait Backend {
    /// Lists the ports this backend can see.
    fn list_ports(&self) -> Result<Vec<PortInfo>, MidiError>;

    /// Opens the first port pair whose name contains `device`, ignoring case.
    fn open(&self, device: &str) -> Result<Box<dyn Port>, MidiError>;
}

/// Gets the backend for the given device name. Names starting with "mock"
/// get a mock backend that records output and never produces input.
pub fn backend(device: &str) -> Box<dyn Backend> {
    if device.starts_with("mock") {
        return Box::new(MockBackend::new(device));
    }

    Box::new(midir::Midir)
}

/// Lists ports known to midir.
pub fn list_devices() -> Result<Vec<PortInfo>, MidiError> {
    midir::Midir.list_ports()
}
