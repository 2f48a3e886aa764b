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
use std::time::Duration;

use crate::{
    fixture::{Color, DmxMode, Fixture},
    patch::{ChannelMap, Slot},
};

/// A DMX universe is 512 channels.
pub const UNIVERSE_SIZE: usize = 512;

/// Length of one on or off phase of the software strobe.
pub const BLINK_WINDOW: Duration = Duration::from_millis(100);

/// Strobe channel range used when the effect speed is set.
const STROBE_SLOWEST: f64 = 16.0;
const STROBE_FASTEST: f64 = 250.0;

/// Strobe channel value when the effect speed is zero.
const STROBE_DEFAULT: u8 = 100;

// Positions of each role within a channel map entry.
const RED: usize = 0;
const GREEN: usize = 1;
const BLUE: usize = 2;
const DIMMER: usize = 3;
const STROBE: usize = 4;
const SPARE: usize = 5;

/// The strobe channel value for an effect speed of 0..=100.
pub fn strobe_value(effect_speed: u8) -> u8 {
    if effect_speed == 0 {
        return STROBE_DEFAULT;
    }
    let speed = f64::from(effect_speed.min(100)) / 100.0;
    (STROBE_SLOWEST + speed * (STROBE_FASTEST - STROBE_SLOWEST)) as u8
}

/// One DMX universe. Channels are 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    data: [u8; UNIVERSE_SIZE],
}

impl Default for Universe {
    fn default() -> Self {
        Universe::new()
    }
}

impl Universe {
    /// Creates a universe with every channel at zero.
    pub fn new() -> Universe {
        Universe {
            data: [0; UNIVERSE_SIZE],
        }
    }

    /// Sets a channel. Channels outside 1..=512 are ignored and the value is
    /// clamped to a byte.
    pub fn set_channel(&mut self, channel: i32, value: i32) {
        if let Some(index) = Self::index(channel) {
            self.data[index] = value.clamp(0, 255) as u8;
        }
    }

    /// Gets a channel, or 0 for channels outside 1..=512.
    pub fn get_channel(&self, channel: i32) -> u8 {
        Self::index(channel).map_or(0, |index| self.data[index])
    }

    pub fn set_rgb(&mut self, start: i32, r: u8, g: u8, b: u8) {
        self.set_channel(start, i32::from(r));
        self.set_channel(start + 1, i32::from(g));
        self.set_channel(start + 2, i32::from(b));
    }

    /// Sets every channel to zero.
    pub fn blackout(&mut self) {
        self.data = [0; UNIVERSE_SIZE];
    }

    pub fn as_slice(&self) -> &[u8; UNIVERSE_SIZE] {
        &self.data
    }

    fn index(channel: i32) -> Option<usize> {
        if (1..=UNIVERSE_SIZE as i32).contains(&channel) {
            Some((channel - 1) as usize)
        } else {
            None
        }
    }

    fn set_slot(&mut self, slots: &[Slot], position: usize, value: u8) {
        if let Some(Slot::Physical(channel)) = slots.get(position) {
            self.set_channel(i32::from(*channel), i32::from(value));
        }
    }

    /// Recomputes the universe from the fixtures. Fixtures without a channel
    /// map entry contribute nothing. Fixtures sharing channels overwrite each
    /// other in list order.
    ///
    /// `clock` is the wall clock used to phase the software strobe of fixtures
    /// whose strobe role is virtual.
    pub fn update_from(
        &mut self,
        fixtures: &[Fixture],
        channels: &ChannelMap,
        effect_speed: u8,
        clock: Duration,
    ) {
        for fixture in fixtures {
            let Some(slots) = channels.get(&fixture.id) else {
                continue;
            };

            if fixture.muted {
                for slot in slots {
                    if let Slot::Physical(channel) = slot {
                        self.set_channel(i32::from(*channel), 0);
                    }
                }
                continue;
            }

            let virtual_dimmer = slots.get(DIMMER).is_some_and(Slot::is_virtual);
            let virtual_strobe = slots.get(STROBE).is_some_and(Slot::is_virtual);

            let mut color = fixture.color;
            if virtual_dimmer {
                color = color.scale(f64::from(fixture.level.min(100)) / 100.0);
            }
            if virtual_strobe && fixture.dmx_mode == DmxMode::Strobe && blink_off(clock) {
                color = Color::BLACK;
            }

            self.set_slot(slots, RED, color.r);
            self.set_slot(slots, GREEN, color.g);
            self.set_slot(slots, BLUE, color.b);

            // Virtual roles still reserve their place on the wire, zero it so
            // nothing from a previous patch lingers there.
            let start = i32::from(fixture.start_address);
            if slots.len() > DIMMER {
                if virtual_dimmer {
                    self.set_channel(start + DIMMER as i32, 0);
                } else {
                    self.set_slot(slots, DIMMER, dimmer_value(fixture.level));
                }
            }
            if slots.len() > STROBE {
                if virtual_strobe {
                    self.set_channel(start + STROBE as i32, 0);
                } else {
                    let value = match fixture.dmx_mode {
                        DmxMode::Strobe => strobe_value(effect_speed),
                        DmxMode::Manual => 0,
                    };
                    self.set_slot(slots, STROBE, value);
                }
            }
            if slots.len() > SPARE {
                match slots[SPARE] {
                    Slot::Virtual => self.set_channel(start + SPARE as i32, 0),
                    Slot::Physical(_) => self.set_slot(slots, SPARE, 0),
                }
            }
        }
    }
}

/// A level of 0..=100 as a dimmer channel value.
fn dimmer_value(level: u8) -> u8 {
    (f64::from(level.min(100)) / 100.0 * 255.0).round() as u8
}

fn blink_off(clock: Duration) -> bool {
    (clock.as_millis() / BLINK_WINDOW.as_millis()) % 2 == 0
}
