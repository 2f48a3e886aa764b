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
use std::collections::BTreeMap;

use crossbeam_channel::{Receiver, Sender};
use midir::{
    MidiInput, MidiInputConnection, MidiInputPort, MidiOutput, MidiOutputConnection,
    MidiOutputPort,
};
use tracing::{debug, info, span, warn, Level};

use super::{Backend, MidiError, Port, PortInfo};

/// The midir backend.
pub struct Midir;

/// An open midir port pair. Input arrives on midir's thread and is queued
/// until the next poll.
pub struct MidirPort {
    name: String,
    output: Option<MidiOutputConnection>,
    receiver: Receiver<Vec<u8>>,
    // Held so the input callback stays connected.
    _input: Option<MidiInputConnection<Sender<Vec<u8>>>>,
}

impl Port for MidirPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, message: &[u8]) -> Result<(), MidiError> {
        match self.output.as_mut() {
            Some(output) => output
                .send(message)
                .map_err(|e| MidiError::Send(e.to_string())),
            None => Ok(()),
        }
    }

    fn receive(&mut self) -> Option<Vec<u8>> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for MidirPort {
    fn drop(&mut self) {
        info!(port = self.name, "Closing MIDI port.");
    }
}

/// Finds the first port whose name contains the device name, ignoring case.
fn find_port<T>(kind: &str, device: &str, ports: Vec<(String, T)>) -> Option<(String, T)> {
    let needle = device.to_lowercase();
    let mut matches = ports
        .into_iter()
        .filter(|(name, _)| name.to_lowercase().contains(&needle))
        .collect::<Vec<(String, T)>>();

    if matches.len() > 1 {
        warn!(
            kind,
            device,
            ports = matches
                .iter()
                .map(|(name, _)| name.clone())
                .collect::<Vec<String>>()
                .join(", "),
            "Several MIDI ports match, using the first."
        );
    }

    if matches.is_empty() {
        None
    } else {
        Some(matches.swap_remove(0))
    }
}

fn input_ports(input: &MidiInput) -> Result<Vec<(String, MidiInputPort)>, MidiError> {
    input
        .ports()
        .into_iter()
        .map(|port| Ok((input.port_name(&port)?, port)))
        .collect()
}

fn output_ports(output: &MidiOutput) -> Result<Vec<(String, MidiOutputPort)>, MidiError> {
    output
        .ports()
        .into_iter()
        .map(|port| Ok((output.port_name(&port)?, port)))
        .collect()
}

impl Backend for Midir {
    fn list_ports(&self) -> Result<Vec<PortInfo>, MidiError> {
        let input = MidiInput::new("padlight input listing")?;
        let output = MidiOutput::new("padlight output listing")?;

        let mut ports: BTreeMap<String, PortInfo> = BTreeMap::new();
        for (name, _) in input_ports(&input)? {
            ports
                .entry(name.clone())
                .or_insert_with(|| PortInfo {
                    name,
                    input: false,
                    output: false,
                })
                .input = true;
        }
        for (name, _) in output_ports(&output)? {
            ports
                .entry(name.clone())
                .or_insert_with(|| PortInfo {
                    name,
                    input: false,
                    output: false,
                })
                .output = true;
        }

        Ok(ports.into_values().collect())
    }

    fn open(&self, device: &str) -> Result<Box<dyn Port>, MidiError> {
        let span = span!(Level::INFO, "open port (midir)");
        let _enter = span.enter();

        let input = MidiInput::new("padlight input")?;
        let output = MidiOutput::new("padlight output")?;

        let input_port = find_port("input", device, input_ports(&input)?);
        let output_port = find_port("output", device, output_ports(&output)?);
        if input_port.is_none() && output_port.is_none() {
            return Err(MidiError::NoMatchingPort(device.to_string()));
        }

        let (sender, receiver) = crossbeam_channel::unbounded::<Vec<u8>>();
        let mut name = String::new();

        let input_connection = match input_port {
            Some((port_name, port)) => {
                name = port_name;
                Some(
                    input
                        .connect(
                            &port,
                            "padlight surface input",
                            |_, raw_event, sender| {
                                debug!(event = ?raw_event, "Received MIDI message.");
                                // The receiver only goes away when the port is dropped.
                                let _ = sender.send(raw_event.to_vec());
                            },
                            sender,
                        )
                        .map_err(|e| MidiError::Connect(e.to_string()))?,
                )
            }
            None => {
                warn!(device, "No MIDI input port matches, surface input disabled.");
                None
            }
        };

        let output_connection = match output_port {
            Some((port_name, port)) => {
                if name.is_empty() {
                    name = port_name;
                }
                Some(
                    output
                        .connect(&port, "padlight surface feedback")
                        .map_err(|e| MidiError::Connect(e.to_string()))?,
                )
            }
            None => {
                warn!(device, "No MIDI output port matches, LED feedback disabled.");
                None
            }
        };

        info!(port = name, "Opened MIDI port.");
        Ok(Box::new(MidirPort {
            name,
            output: output_connection,
            receiver,
            _input: input_connection,
        }))
    }
}
