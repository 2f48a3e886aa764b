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
//! A DMX512 lighting controller. Fixtures are patched onto one universe, sent
//! over Art-Net, and driven from a MIDI pad surface whose LEDs mirror the
//! lighting state.

pub mod config;
pub mod console;
pub mod dmx;
pub mod effects;
pub mod fixture;
pub mod midi;
pub mod patch;
pub mod scheduler;
