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
use crate::fixture::Color;

/// Velocity codes for the canonical pad colors.
pub const PALETTE_VELOCITIES: [(Color, u8); 8] = [
    (Color::new(0xff, 0xff, 0xff), 3),
    (Color::new(0xff, 0x00, 0x00), 5),
    (Color::new(0xff, 0x88, 0x00), 9),
    (Color::new(0xff, 0xdd, 0x00), 13),
    (Color::new(0x00, 0xff, 0x00), 21),
    (Color::new(0x00, 0xdd, 0xdd), 37),
    (Color::new(0x00, 0x00, 0xff), 45),
    (Color::new(0xff, 0x00, 0xff), 53),
];

/// The code used when nothing else matches.
pub const DEFAULT_VELOCITY: u8 = 5;

/// Maps a color to the pad velocity code that shows it. Canonical colors map
/// exactly, anything else goes by its dominant channels.
pub fn rgb_to_akai_velocity(color: Color) -> u8 {
    if let Some((_, velocity)) = PALETTE_VELOCITIES.iter().find(|(c, _)| *c == color) {
        return *velocity;
    }

    let Color { r, g, b } = color;
    if r > 200 && g > 200 && b > 200 {
        5
    } else if r > 150 && g < 150 && b < 150 {
        3
    } else if r > 200 && g > 100 && g < 200 && b < 100 {
        9
    } else if r > 200 && g > 200 && b < 100 {
        13
    } else if g > 150 && r < 150 && b < 150 {
        21
    } else if g > 150 && b > 150 && r < 100 {
        37
    } else if b > 150 && r < 150 && g < 150 {
        45
    } else if r > 150 && b > 150 && g < 100 {
        53
    } else {
        DEFAULT_VELOCITY
    }
}
