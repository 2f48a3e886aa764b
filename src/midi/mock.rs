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
use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;
use tracing::info;

use super::{Backend, MidiError, Port, PortInfo};

#[derive(Default)]
struct State {
    pending: VecDeque<Vec<u8>>,
    sent: Vec<Vec<u8>>,
    failing: bool,
    opened: usize,
}

/// A mock port. Doesn't talk to any hardware. Clones share state, so a test
/// can keep one to inject input and inspect output.
#[derive(Clone)]
pub struct MockPort {
    name: String,
    state: Arc<Mutex<State>>,
}

impl MockPort {
    pub fn new(name: &str) -> MockPort {
        MockPort {
            name: name.to_string(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Queues a raw message as if the hardware sent it.
    pub fn inject(&self, message: &[u8]) {
        self.state.lock().pending.push_back(message.to_vec());
    }

    /// Takes every message sent so far.
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.state.lock().sent)
    }

    /// Makes every following send fail until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    /// How many times the port has been opened.
    pub fn opened(&self) -> usize {
        self.state.lock().opened
    }
}

impl Port for MockPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, message: &[u8]) -> Result<(), MidiError> {
        let mut state = self.state.lock();
        if state.failing {
            return Err(MidiError::Send("mock port failure".to_string()));
        }
        state.sent.push(message.to_vec());
        Ok(())
    }

    fn receive(&mut self) -> Option<Vec<u8>> {
        self.state.lock().pending.pop_front()
    }
}

/// Hands out clones of one mock port.
#[derive(Clone)]
pub struct MockBackend {
    port: MockPort,
    available: Arc<Mutex<bool>>,
}

impl MockBackend {
    pub fn new(name: &str) -> MockBackend {
        MockBackend {
            port: MockPort::new(name),
            available: Arc::new(Mutex::new(true)),
        }
    }

    /// The port this backend opens.
    pub fn port(&self) -> MockPort {
        self.port.clone()
    }

    /// Simulates the device being unplugged or plugged back in.
    pub fn set_available(&self, available: bool) {
        *self.available.lock() = available;
    }
}

impl Backend for MockBackend {
    fn list_ports(&self) -> Result<Vec<PortInfo>, MidiError> {
        if !*self.available.lock() {
            return Ok(Vec::new());
        }
        Ok(vec![PortInfo {
            name: self.port.name.clone(),
            input: true,
            output: true,
        }])
    }

    fn open(&self, device: &str) -> Result<Box<dyn Port>, MidiError> {
        let matches = self
            .port
            .name
            .to_lowercase()
            .contains(&device.to_lowercase());
        if !*self.available.lock() || !matches {
            return Err(MidiError::NoMatchingPort(device.to_string()));
        }

        self.port.state.lock().opened += 1;
        info!(port = self.port.name, "Opened mock MIDI port.");
        Ok(Box::new(self.port.clone()))
    }
}
