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
use midly::{
    live::LiveEvent,
    num::{u4, u7},
    MidiMessage,
};
use tracing::{debug, info, span, warn, Level};

use super::{Backend, Port};
use crate::console::Feedback;

/// Controllers 48..=56 are the nine faders.
const FIRST_FADER_CC: u8 = 48;
const LAST_FADER_CC: u8 = 56;
/// Notes 0..=63 are the pad grid, bottom row first.
const LAST_PAD_NOTE: u8 = 63;
const FIRST_MUTE_NOTE: u8 = 100;
const LAST_MUTE_NOTE: u8 = 107;
const FIRST_EFFECT_NOTE: u8 = 112;
const LAST_EFFECT_NOTE: u8 = 119;
const BLACKOUT_NOTE: u8 = 122;

/// Pad grid rows and columns.
pub const GRID_SIZE: u8 = 8;
/// The column of effect squares to the right of the grid.
pub const EFFECT_COLUMN: u8 = 8;

/// Square LEDs are on or off, this is "on".
const SQUARE_ON: u8 = 3;
/// MIDI channel that lights a pad at full brightness. Channel 0 is dim.
const FULL_BRIGHTNESS_CHANNEL: u8 = 6;
const FULL_BRIGHTNESS_THRESHOLD: u8 = 80;

/// A decoded surface control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceInput {
    /// Fader 0..=8 moved to 0..=100.
    Fader { index: usize, value: u8 },
    /// Grid pad pressed. Row 0 is the top row.
    Pad { row: usize, col: usize },
    /// Mute square under fader 0..=7.
    Mute(usize),
    /// Effect square 0..=7.
    Effect(usize),
    Blackout,
}

/// Decodes one raw message. Anything that isn't a surface control, including
/// note-ons with velocity zero, decodes to `None`.
pub fn decode(message: &[u8]) -> Option<SurfaceInput> {
    let LiveEvent::Midi { message, .. } = LiveEvent::parse(message).ok()? else {
        return None;
    };

    match message {
        MidiMessage::Controller { controller, value } => {
            let controller = controller.as_int();
            if (FIRST_FADER_CC..=LAST_FADER_CC).contains(&controller) {
                Some(SurfaceInput::Fader {
                    index: usize::from(controller - FIRST_FADER_CC),
                    value: fader_percent(value.as_int()),
                })
            } else {
                None
            }
        }
        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => decode_note(key.as_int()),
        _ => None,
    }
}

fn decode_note(note: u8) -> Option<SurfaceInput> {
    match note {
        0..=LAST_PAD_NOTE => Some(SurfaceInput::Pad {
            row: usize::from(GRID_SIZE - 1 - note / GRID_SIZE),
            col: usize::from(note % GRID_SIZE),
        }),
        FIRST_MUTE_NOTE..=LAST_MUTE_NOTE => {
            Some(SurfaceInput::Mute(usize::from(note - FIRST_MUTE_NOTE)))
        }
        FIRST_EFFECT_NOTE..=LAST_EFFECT_NOTE => {
            Some(SurfaceInput::Effect(usize::from(note - FIRST_EFFECT_NOTE)))
        }
        BLACKOUT_NOTE => Some(SurfaceInput::Blackout),
        _ => None,
    }
}

/// Rescales a 7 bit fader value to 0..=100.
fn fader_percent(value: u8) -> u8 {
    (f64::from(value.min(127)) / 127.0 * 100.0) as u8
}

/// The note of a grid pad. The hardware counts rows from the bottom.
pub fn pad_note(row: u8, col: u8) -> u8 {
    (GRID_SIZE - 1 - row.min(GRID_SIZE - 1)) * GRID_SIZE + col.min(GRID_SIZE - 1)
}

/// The message that lights a pad. Grid pads take a color velocity and one of
/// two brightness levels, picked by MIDI channel. Effect squares in column 8
/// are on or off.
pub fn set_pad_led(row: u8, col: u8, velocity: u8, brightness: u8) -> LiveEvent<'static> {
    if col == EFFECT_COLUMN {
        let vel = if velocity > 0 { SQUARE_ON } else { 0 };
        return note_on(0, FIRST_EFFECT_NOTE + row.min(GRID_SIZE - 1), vel);
    }

    let channel = if brightness >= FULL_BRIGHTNESS_THRESHOLD {
        FULL_BRIGHTNESS_CHANNEL
    } else {
        0
    };
    note_on(channel, pad_note(row, col), velocity)
}

fn note_on(channel: u8, key: u8, vel: u8) -> LiveEvent<'static> {
    LiveEvent::Midi {
        channel: u4::from(channel),
        message: MidiMessage::NoteOn {
            key: u7::from(key),
            vel: u7::from(vel),
        },
    }
}

fn square(note: u8, on: bool) -> LiveEvent<'static> {
    note_on(0, note, if on { SQUARE_ON } else { 0 })
}

/// The messages that show a piece of feedback on the surface.
pub fn encode(feedback: &Feedback) -> Vec<LiveEvent<'static>> {
    match *feedback {
        Feedback::Pad {
            row,
            col,
            velocity,
            brightness,
        } => vec![set_pad_led(row, col, velocity, brightness)],
        Feedback::EffectSquare { index, on } => {
            vec![set_pad_led(index, EFFECT_COLUMN, u8::from(on), 100)]
        }
        Feedback::MuteSquare { index, on } => vec![square(FIRST_MUTE_NOTE + index, on)],
        Feedback::Blackout(on) => vec![square(BLACKOUT_NOTE, on)],
        Feedback::ClearPads => (0..=LAST_PAD_NOTE).map(|note| note_on(0, note, 0)).collect(),
    }
}

fn to_bytes(event: &LiveEvent) -> Option<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::with_capacity(3);
    event.write(&mut buf).ok()?;
    Some(buf)
}

/// Connects the surface to the console. Without an open port every call is a
/// no-op.
pub struct MidiBridge {
    backend: Box<dyn Backend>,
    device: String,
    port: Option<Box<dyn Port>>,
}

impl MidiBridge {
    /// Creates a bridge. No port is opened until `reconnect`.
    pub fn new(backend: Box<dyn Backend>, device: &str) -> MidiBridge {
        MidiBridge {
            backend,
            device: device.to_string(),
            port: None,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn is_available(&self) -> bool {
        self.port.is_some()
    }

    /// Closes any open port and opens the device again. Returns whether a port
    /// is open afterwards.
    pub fn reconnect(&mut self) -> bool {
        let span = span!(Level::INFO, "midi reconnect");
        let _enter = span.enter();

        self.close();
        match self.backend.open(&self.device) {
            Ok(port) => {
                info!(port = port.name(), "MIDI surface connected.");
                self.port = Some(port);
                true
            }
            Err(e) => {
                warn!(
                    device = self.device,
                    err = e.to_string(),
                    "MIDI surface unavailable, continuing without it."
                );
                false
            }
        }
    }

    /// Drains pending input and decodes it.
    pub fn poll(&mut self) -> Vec<SurfaceInput> {
        let Some(port) = self.port.as_mut() else {
            return Vec::new();
        };

        let mut inputs = Vec::new();
        while let Some(message) = port.receive() {
            match decode(&message) {
                Some(input) => {
                    debug!(input = ?input, "Decoded surface input.");
                    inputs.push(input);
                }
                None => debug!(message = ?message, "Ignoring unmapped MIDI message."),
            }
        }
        inputs
    }

    /// Writes feedback to the surface. A failed send closes the port.
    pub fn write(&mut self, feedback: &[Feedback]) {
        let Some(port) = self.port.as_mut() else {
            return;
        };

        let result = feedback
            .iter()
            .flat_map(encode)
            .filter_map(|event| to_bytes(&event))
            .try_for_each(|bytes| port.send(&bytes));
        if let Err(e) = result {
            warn!(err = e.to_string(), "MIDI feedback failed, closing port.");
            self.port = None;
        }
    }

    pub fn close(&mut self) {
        if let Some(port) = self.port.take() {
            info!(port = port.name(), "MIDI surface disconnected.");
        }
    }
}
