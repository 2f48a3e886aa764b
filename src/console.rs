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
use std::collections::HashMap;

use tracing::{debug, info};

use crate::{
    effects::{Effect, EffectContext, EffectEngine, EffectError},
    fixture::{Color, Delta, Edit, Fixture, FixtureRegistry, Group},
    midi::{rgb_to_akai_velocity, SurfaceInput},
    patch::PatchError,
};

/// Faders that drive fixture groups. The fader after them sets effect speed.
pub const GROUP_FADERS: usize = 8;
pub const SPEED_FADER: usize = GROUP_FADERS;
pub const PALETTE_SIZE: usize = 8;

const ACTIVE_BRIGHTNESS: u8 = 100;
const IDLE_BRIGHTNESS: u8 = 20;

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Effect(#[from] EffectError),

    #[error("no fader at index {0}")]
    UnknownFader(usize),

    #[error("no pad at row {row}, column {col}")]
    UnknownPad { row: usize, col: usize },
}

/// How the surface maps onto the rig. Immutable once the console is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// The groups each group fader drives. Faders with identical lists are
    /// linked.
    pub faders: [Vec<Group>; GROUP_FADERS],
    /// Pad color for each row, top row first.
    pub palette: [Color; PALETTE_SIZE],
    /// Groups the rainbow effect runs across.
    pub rainbow_groups: Vec<Group>,
}

impl Default for Layout {
    fn default() -> Self {
        let side = || vec![Group::Lat, Group::Contre];
        Layout {
            faders: [
                vec![Group::Face],
                vec![Group::Douche1],
                vec![Group::Douche2],
                vec![Group::Douche3],
                side(),
                side(),
                side(),
                side(),
            ],
            palette: [
                Color::new(0xff, 0xff, 0xff),
                Color::new(0xff, 0x00, 0x00),
                Color::new(0xff, 0x88, 0x00),
                Color::new(0xff, 0xdd, 0x00),
                Color::new(0x00, 0xff, 0x00),
                Color::new(0x00, 0xdd, 0xdd),
                Color::new(0x00, 0x00, 0xff),
                Color::new(0xff, 0x00, 0xff),
            ],
            rainbow_groups: side(),
        }
    }
}

impl Layout {
    /// Every fader linked to the given one, itself included.
    pub fn linked(&self, fader: usize) -> Vec<usize> {
        let Some(groups) = self.faders.get(fader) else {
            return Vec::new();
        };
        (0..GROUP_FADERS)
            .filter(|other| &self.faders[*other] == groups)
            .collect()
    }

    /// The first fader of the given fader's link set.
    pub fn logical_fader(&self, fader: usize) -> usize {
        self.linked(fader).first().copied().unwrap_or(fader)
    }

    pub fn effect_context(&self) -> EffectContext {
        EffectContext {
            rainbow_groups: self.rainbow_groups.clone(),
        }
    }
}

/// The single entry point for everything that changes the rig.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// Fader 0..=8 moved to 0..=100.
    Fader { index: usize, value: u8 },
    /// Pad pressed. Column 8 is the effect column.
    Pad { row: usize, col: usize },
    ToggleMute { fader: usize },
    ToggleEffect { index: usize },
    ToggleBlackout,
    Edit(Edit),
}

impl From<SurfaceInput> for ControlEvent {
    fn from(input: SurfaceInput) -> Self {
        match input {
            SurfaceInput::Fader { index, value } => ControlEvent::Fader { index, value },
            SurfaceInput::Pad { row, col } => ControlEvent::Pad { row, col },
            SurfaceInput::Mute(fader) => ControlEvent::ToggleMute { fader },
            SurfaceInput::Effect(index) => ControlEvent::ToggleEffect { index },
            SurfaceInput::Blackout => ControlEvent::ToggleBlackout,
        }
    }
}

/// LED state to mirror onto the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Pad {
        row: u8,
        col: u8,
        velocity: u8,
        brightness: u8,
    },
    EffectSquare {
        index: u8,
        on: bool,
    },
    MuteSquare {
        index: u8,
        on: bool,
    },
    Blackout(bool),
    /// Turns every grid pad off.
    ClearPads,
}

/// The result of applying an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub delta: Delta,
    pub feedback: Vec<Feedback>,
}

impl Outcome {
    fn new(delta: Delta) -> Outcome {
        Outcome {
            delta,
            feedback: Vec::new(),
        }
    }
}

/// Levels and colors held aside while blacked out.
type BlackoutSnapshot = HashMap<String, (u8, Color)>;

/// The state of the control surface and the rules that turn surface
/// actions into fixture changes.
pub struct Console {
    layout: Layout,
    faders: [u8; GROUP_FADERS + 1],
    active_pads: [Option<usize>; GROUP_FADERS],
    /// A column owns its groups once its fader moved or a pad was pressed.
    owned: [bool; GROUP_FADERS],
    mutes: [bool; GROUP_FADERS],
    blackout: Option<BlackoutSnapshot>,
}

impl Console {
    pub fn new(layout: Layout) -> Console {
        Console {
            layout,
            faders: [0; GROUP_FADERS + 1],
            active_pads: [None; GROUP_FADERS],
            owned: [false; GROUP_FADERS],
            mutes: [false; GROUP_FADERS],
            blackout: None,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn fader(&self, index: usize) -> Option<u8> {
        self.faders.get(index).copied()
    }

    pub fn active_pad(&self, col: usize) -> Option<usize> {
        self.active_pads.get(col).copied().flatten()
    }

    pub fn is_muted(&self, fader: usize) -> bool {
        self.mutes.get(fader).copied().unwrap_or(false)
    }

    pub fn is_blackout(&self) -> bool {
        self.blackout.is_some()
    }

    /// Applies an event to the rig and returns what changed plus the LED
    /// feedback to write immediately.
    pub fn apply(
        &mut self,
        event: ControlEvent,
        registry: &mut FixtureRegistry,
        effects: &mut EffectEngine,
    ) -> Result<Outcome, ControlError> {
        debug!(event = ?event, "Applying control event.");
        match event {
            ControlEvent::Fader { index, value } => {
                self.move_fader(index, value, registry, effects)
            }
            ControlEvent::Pad { row, col } if col == GROUP_FADERS => {
                self.toggle_effect(row, registry, effects)
            }
            ControlEvent::Pad { row, col } => self.press_pad(row, col, registry),
            ControlEvent::ToggleMute { fader } => self.toggle_mute(fader, registry),
            ControlEvent::ToggleEffect { index } => self.toggle_effect(index, registry, effects),
            ControlEvent::ToggleBlackout => Ok(self.toggle_blackout(registry)),
            ControlEvent::Edit(edit) => Ok(Outcome::new(registry.apply(edit)?)),
        }
    }

    fn move_fader(
        &mut self,
        index: usize,
        value: u8,
        registry: &mut FixtureRegistry,
        effects: &mut EffectEngine,
    ) -> Result<Outcome, ControlError> {
        let value = value.min(100);
        if index == SPEED_FADER {
            self.faders[SPEED_FADER] = value;
            effects.set_speed(value);
            return Ok(Outcome::new(Delta::Output));
        }
        if index >= GROUP_FADERS {
            return Err(ControlError::UnknownFader(index));
        }

        let mut outcome = Outcome::new(Delta::Output);
        let linked = self.layout.linked(index);
        for fader in &linked {
            self.faders[*fader] = value;
            self.owned[*fader] = true;
        }

        // Raising a fader with no color picked starts it on the first pad.
        let groups = self.layout.faders[index].clone();
        if value > 0 && self.active_pads[index].is_none() {
            for fader in &linked {
                self.active_pads[*fader] = Some(0);
            }
            for fixture in registry.in_groups(&groups) {
                fixture.base_color = self.layout.palette[0];
            }
            outcome.feedback.extend(self.column_leds(&linked));
        }

        if !self.is_blackout() {
            for fixture in registry.in_groups(&groups) {
                fixture.set_level(value);
            }
        }
        Ok(outcome)
    }

    fn press_pad(
        &mut self,
        row: usize,
        col: usize,
        registry: &mut FixtureRegistry,
    ) -> Result<Outcome, ControlError> {
        if row >= PALETTE_SIZE || col >= GROUP_FADERS {
            return Err(ControlError::UnknownPad { row, col });
        }

        let linked = self.layout.linked(col);
        for fader in &linked {
            self.active_pads[*fader] = Some(row);
            self.owned[*fader] = true;
        }

        let color = self.layout.palette[row];
        let blackout = self.is_blackout();
        let groups = self.layout.faders[col].clone();
        for fixture in registry.in_groups(&groups) {
            if blackout {
                fixture.base_color = color;
            } else {
                fixture.set_base_color(color);
            }
        }

        Ok(Outcome {
            delta: Delta::Output,
            feedback: self.column_leds(&linked),
        })
    }

    fn toggle_mute(
        &mut self,
        fader: usize,
        registry: &mut FixtureRegistry,
    ) -> Result<Outcome, ControlError> {
        if fader >= GROUP_FADERS {
            return Err(ControlError::UnknownFader(fader));
        }

        let muted = !self.mutes[fader];
        let linked = self.layout.linked(fader);
        for index in &linked {
            self.mutes[*index] = muted;
        }
        let groups = self.layout.faders[fader].clone();
        for fixture in registry.in_groups(&groups) {
            fixture.muted = muted;
        }

        info!(fader, muted, "Toggled mute.");
        Ok(Outcome {
            delta: Delta::Output,
            feedback: linked
                .iter()
                .map(|index| Feedback::MuteSquare {
                    index: *index as u8,
                    on: muted,
                })
                .collect(),
        })
    }

    fn toggle_effect(
        &mut self,
        index: usize,
        registry: &mut FixtureRegistry,
        effects: &mut EffectEngine,
    ) -> Result<Outcome, ControlError> {
        let effect = Effect::from_index(index)?;
        let mut outcome = Outcome::new(Delta::Output);

        if let Some(running) = effects.active() {
            effects.deactivate(registry.fixtures_mut());
            self.reapply_owned(registry);
            self.hold_blackout(registry.fixtures_mut());
            outcome.feedback.push(Feedback::EffectSquare {
                index: running.index() as u8,
                on: false,
            });
            if running == effect {
                return Ok(outcome);
            }
        }

        effects.activate(effect, registry.fixtures_mut());
        outcome.feedback.push(Feedback::EffectSquare {
            index: index as u8,
            on: true,
        });
        Ok(outcome)
    }

    /// Holds every fixture dark while blacked out. Runs after anything that
    /// restores or steps effect colors.
    pub fn hold_blackout(&self, fixtures: &mut [Fixture]) {
        if !self.is_blackout() {
            return;
        }
        for fixture in fixtures.iter_mut() {
            fixture.level = 0;
            fixture.color = Color::BLACK;
        }
    }

    fn toggle_blackout(&mut self, registry: &mut FixtureRegistry) -> Outcome {
        match self.blackout.take() {
            None => {
                let snapshot = registry
                    .fixtures()
                    .iter()
                    .map(|fixture| (fixture.id.clone(), (fixture.level, fixture.color)))
                    .collect();
                for fixture in registry.fixtures_mut() {
                    fixture.level = 0;
                    fixture.color = Color::BLACK;
                }
                self.blackout = Some(snapshot);
                info!("Blackout on.");
            }
            Some(snapshot) => {
                for fixture in registry.fixtures_mut() {
                    if let Some((level, color)) = snapshot.get(&fixture.id) {
                        fixture.level = *level;
                        fixture.color = *color;
                    }
                }
                self.reapply_owned(registry);
                info!("Blackout off.");
            }
        }

        Outcome {
            delta: Delta::Output,
            feedback: vec![Feedback::Blackout(self.is_blackout())],
        }
    }

    /// Re-applies the fader level and pad color of every owned column to its
    /// groups. Does nothing while blacked out.
    pub fn reapply_owned(&self, registry: &mut FixtureRegistry) {
        if self.is_blackout() {
            return;
        }

        for fader in 0..GROUP_FADERS {
            if !self.owned[fader] || self.layout.logical_fader(fader) != fader {
                continue;
            }
            let color = self.active_pads[fader].map(|row| self.layout.palette[row]);
            let level = self.faders[fader];
            for fixture in registry.in_groups(&self.layout.faders[fader]) {
                if let Some(color) = color {
                    fixture.base_color = color;
                }
                fixture.set_level(level);
            }
        }
    }

    /// Pad LEDs for the given columns: the active pad bright, the rest dim.
    fn column_leds(&self, columns: &[usize]) -> Vec<Feedback> {
        columns
            .iter()
            .flat_map(|col| {
                let active = self.active_pads[*col];
                self.layout
                    .palette
                    .iter()
                    .enumerate()
                    .map(move |(row, color)| Feedback::Pad {
                        row: row as u8,
                        col: *col as u8,
                        velocity: rgb_to_akai_velocity(*color),
                        brightness: if active == Some(row) {
                            ACTIVE_BRIGHTNESS
                        } else {
                            IDLE_BRIGHTNESS
                        },
                    })
            })
            .collect()
    }

    /// Everything needed to bring a freshly connected surface in line.
    pub fn led_state(&self, effects: &EffectEngine) -> Vec<Feedback> {
        let mut feedback = vec![Feedback::ClearPads];
        feedback.extend(self.column_leds(&(0..GROUP_FADERS).collect::<Vec<usize>>()));
        feedback.extend(Effect::ALL.iter().map(|effect| Feedback::EffectSquare {
            index: effect.index() as u8,
            on: effects.active() == Some(*effect),
        }));
        feedback.extend((0..GROUP_FADERS).map(|fader| Feedback::MuteSquare {
            index: fader as u8,
            on: self.mutes[fader],
        }));
        feedback.push(Feedback::Blackout(self.is_blackout()));
        feedback
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn setup() -> (Console, FixtureRegistry, EffectEngine) {
        let layout = Layout::default();
        let effects = EffectEngine::with_seed(layout.effect_context(), 1);
        (Console::new(layout), FixtureRegistry::with_defaults(), effects)
    }

    fn colors_of(registry: &FixtureRegistry, group: Group) -> Vec<Color> {
        registry
            .fixtures()
            .iter()
            .filter(|f| f.group == group)
            .map(|f| f.color)
            .collect()
    }

    #[test]
    fn test_layout_links() {
        let layout = Layout::default();
        assert_eq!(vec![0], layout.linked(0));
        assert_eq!(vec![4, 5, 6, 7], layout.linked(6));
        assert_eq!(4, layout.logical_fader(7));
        assert_eq!(3, layout.logical_fader(3));
        assert!(layout.linked(9).is_empty());
    }

    #[test]
    fn test_fader_sets_level_and_picks_white() {
        let (mut console, mut registry, mut effects) = setup();

        let outcome = console
            .apply(
                ControlEvent::Fader {
                    index: 0,
                    value: 50,
                },
                &mut registry,
                &mut effects,
            )
            .unwrap();

        assert_eq!(Delta::Output, outcome.delta);
        assert_eq!(Some(0), console.active_pad(0));
        assert_eq!(vec![Color::new(127, 127, 127); 4], colors_of(&registry, Group::Face));
        assert_eq!(vec![Color::BLACK; 3], colors_of(&registry, Group::Douche1));

        assert_eq!(8, outcome.feedback.len());
        assert_eq!(
            Feedback::Pad {
                row: 0,
                col: 0,
                velocity: 3,
                brightness: 100
            },
            outcome.feedback[0]
        );
        assert_eq!(
            Feedback::Pad {
                row: 1,
                col: 0,
                velocity: 5,
                brightness: 20
            },
            outcome.feedback[1]
        );

        // Once a pad is active, fader moves don't touch the LEDs.
        let outcome = console
            .apply(
                ControlEvent::Fader {
                    index: 0,
                    value: 0,
                },
                &mut registry,
                &mut effects,
            )
            .unwrap();
        assert!(outcome.feedback.is_empty());
        assert_eq!(vec![Color::BLACK; 4], colors_of(&registry, Group::Face));
    }

    #[test]
    fn test_linked_faders() {
        let (mut console, mut registry, mut effects) = setup();

        let outcome = console
            .apply(
                ControlEvent::Fader {
                    index: 5,
                    value: 100,
                },
                &mut registry,
                &mut effects,
            )
            .unwrap();

        for fader in 4..8 {
            assert_eq!(Some(100), console.fader(fader));
            assert_eq!(Some(0), console.active_pad(fader));
        }
        assert_eq!(32, outcome.feedback.len());
        assert_eq!(vec![Color::WHITE; 2], colors_of(&registry, Group::Lat));
        assert_eq!(vec![Color::WHITE; 6], colors_of(&registry, Group::Contre));
    }

    #[test]
    fn test_speed_fader() {
        let (mut console, mut registry, mut effects) = setup();
        console
            .apply(
                ControlEvent::Fader {
                    index: 8,
                    value: 60,
                },
                &mut registry,
                &mut effects,
            )
            .unwrap();
        assert_eq!(60, effects.speed());
        assert!(console
            .apply(
                ControlEvent::Fader {
                    index: 9,
                    value: 60,
                },
                &mut registry,
                &mut effects,
            )
            .is_err());
    }

    #[test]
    fn test_pad_press_recolors() {
        let (mut console, mut registry, mut effects) = setup();
        console
            .apply(
                ControlEvent::Fader {
                    index: 1,
                    value: 100,
                },
                &mut registry,
                &mut effects,
            )
            .unwrap();

        let outcome = console
            .apply(
                ControlEvent::Pad { row: 6, col: 1 },
                &mut registry,
                &mut effects,
            )
            .unwrap();

        assert_eq!(Some(6), console.active_pad(1));
        assert_eq!(
            vec![Color::new(0, 0, 255); 3],
            colors_of(&registry, Group::Douche1)
        );
        assert_eq!(
            Feedback::Pad {
                row: 6,
                col: 1,
                velocity: 45,
                brightness: 100
            },
            outcome.feedback[6]
        );
        assert!(console
            .apply(
                ControlEvent::Pad { row: 8, col: 1 },
                &mut registry,
                &mut effects
            )
            .is_err());
    }

    #[test]
    fn test_effect_column_toggles_effect() {
        let (mut console, mut registry, mut effects) = setup();

        let outcome = console
            .apply(
                ControlEvent::Pad { row: 3, col: 8 },
                &mut registry,
                &mut effects,
            )
            .unwrap();
        assert_eq!(Some(Effect::Chase), effects.active());
        assert_eq!(
            vec![Feedback::EffectSquare { index: 3, on: true }],
            outcome.feedback
        );

        let outcome = console
            .apply(
                ControlEvent::ToggleEffect { index: 5 },
                &mut registry,
                &mut effects,
            )
            .unwrap();
        assert_eq!(Some(Effect::ColorWave), effects.active());
        assert_eq!(
            vec![
                Feedback::EffectSquare {
                    index: 3,
                    on: false
                },
                Feedback::EffectSquare { index: 5, on: true },
            ],
            outcome.feedback
        );

        let outcome = console
            .apply(
                ControlEvent::ToggleEffect { index: 5 },
                &mut registry,
                &mut effects,
            )
            .unwrap();
        assert_eq!(None, effects.active());
        assert_eq!(
            vec![Feedback::EffectSquare {
                index: 5,
                on: false
            }],
            outcome.feedback
        );
    }

    #[test]
    fn test_effect_stop_reapplies_owned_columns() {
        let (mut console, mut registry, mut effects) = setup();
        console
            .apply(
                ControlEvent::Fader {
                    index: 0,
                    value: 100,
                },
                &mut registry,
                &mut effects,
            )
            .unwrap();
        console
            .apply(
                ControlEvent::ToggleEffect { index: 0 },
                &mut registry,
                &mut effects,
            )
            .unwrap();
        effects.step(registry.fixtures_mut());

        // A pad pressed mid-effect is what the column shows once it stops.
        console
            .apply(
                ControlEvent::Pad { row: 1, col: 0 },
                &mut registry,
                &mut effects,
            )
            .unwrap();
        effects.step(registry.fixtures_mut());
        console
            .apply(
                ControlEvent::ToggleEffect { index: 0 },
                &mut registry,
                &mut effects,
            )
            .unwrap();

        assert_eq!(
            vec![Color::new(255, 0, 0); 4],
            colors_of(&registry, Group::Face)
        );
        assert!(registry
            .fixtures()
            .iter()
            .all(|f| f.dmx_mode == crate::fixture::DmxMode::Manual));
    }

    #[test]
    fn test_mute_linked() {
        let (mut console, mut registry, mut effects) = setup();

        let outcome = console
            .apply(
                ControlEvent::ToggleMute { fader: 4 },
                &mut registry,
                &mut effects,
            )
            .unwrap();
        assert_eq!(4, outcome.feedback.len());
        assert_eq!(
            Feedback::MuteSquare { index: 7, on: true },
            outcome.feedback[3]
        );
        assert!(console.is_muted(6));
        assert!(registry
            .fixtures()
            .iter()
            .filter(|f| f.group == Group::Lat || f.group == Group::Contre)
            .all(|f| f.muted));
        assert!(registry
            .fixtures()
            .iter()
            .filter(|f| f.group == Group::Face)
            .all(|f| !f.muted));

        console
            .apply(
                ControlEvent::ToggleMute { fader: 7 },
                &mut registry,
                &mut effects,
            )
            .unwrap();
        assert!(registry.fixtures().iter().all(|f| !f.muted));
    }

    #[test]
    fn test_blackout() {
        let (mut console, mut registry, mut effects) = setup();
        console
            .apply(
                ControlEvent::Fader {
                    index: 0,
                    value: 100,
                },
                &mut registry,
                &mut effects,
            )
            .unwrap();

        let outcome = console
            .apply(ControlEvent::ToggleBlackout, &mut registry, &mut effects)
            .unwrap();
        assert_eq!(vec![Feedback::Blackout(true)], outcome.feedback);
        assert!(registry.fixtures().iter().all(|f| f.level == 0));
        assert_eq!(vec![Color::BLACK; 4], colors_of(&registry, Group::Face));

        // Moves while blacked out are held until blackout ends.
        console
            .apply(
                ControlEvent::Fader {
                    index: 1,
                    value: 100,
                },
                &mut registry,
                &mut effects,
            )
            .unwrap();
        assert_eq!(vec![Color::BLACK; 3], colors_of(&registry, Group::Douche1));

        let outcome = console
            .apply(ControlEvent::ToggleBlackout, &mut registry, &mut effects)
            .unwrap();
        assert_eq!(vec![Feedback::Blackout(false)], outcome.feedback);
        assert_eq!(vec![Color::WHITE; 4], colors_of(&registry, Group::Face));
        assert_eq!(vec![Color::WHITE; 3], colors_of(&registry, Group::Douche1));
    }

    #[test]
    fn test_effect_stop_during_blackout_stays_dark() {
        let layout = Layout::default();
        let mut effects = EffectEngine::with_seed(layout.effect_context(), 1);
        let mut console = Console::new(layout);
        let mut registry = FixtureRegistry::new();
        registry.add(
            Group::Face,
            None,
            crate::fixture::FixtureType::ParLed,
            crate::patch::Mode::Three,
            Some(1),
        );

        let events = [
            ControlEvent::Fader {
                index: 0,
                value: 100,
            },
            ControlEvent::Pad { row: 1, col: 0 },
            ControlEvent::ToggleEffect { index: 7 },
            ControlEvent::ToggleBlackout,
        ];
        for event in events {
            console.apply(event, &mut registry, &mut effects).unwrap();
        }
        effects.step(registry.fixtures_mut());

        console
            .apply(
                ControlEvent::ToggleEffect { index: 7 },
                &mut registry,
                &mut effects,
            )
            .unwrap();
        assert!(console.is_blackout());
        assert_eq!(vec![Color::BLACK], colors_of(&registry, Group::Face));
        assert_eq!(0, registry.fixtures()[0].level);

        console
            .apply(ControlEvent::ToggleBlackout, &mut registry, &mut effects)
            .unwrap();
        assert_eq!(
            vec![Color::new(255, 0, 0)],
            colors_of(&registry, Group::Face)
        );
        assert_eq!(100, registry.fixtures()[0].level);
    }

    #[test]
    fn test_edit_event() {
        let (mut console, mut registry, mut effects) = setup();
        let outcome = console
            .apply(
                ControlEvent::Edit(Edit::AutoAddress),
                &mut registry,
                &mut effects,
            )
            .unwrap();
        assert_eq!(Delta::Patch, outcome.delta);

        let result = console.apply(
            ControlEvent::Edit(Edit::Remove {
                id: "missing".to_string(),
            }),
            &mut registry,
            &mut effects,
        );
        assert!(matches!(result, Err(ControlError::Patch(_))));
    }

    #[test]
    fn test_led_state() {
        let (mut console, mut registry, mut effects) = setup();
        console
            .apply(
                ControlEvent::ToggleMute { fader: 2 },
                &mut registry,
                &mut effects,
            )
            .unwrap();
        console
            .apply(
                ControlEvent::ToggleEffect { index: 6 },
                &mut registry,
                &mut effects,
            )
            .unwrap();

        let leds = console.led_state(&effects);
        assert_eq!(1 + 64 + 8 + 8 + 1, leds.len());
        assert_eq!(Feedback::ClearPads, leds[0]);
        assert!(leds.contains(&Feedback::EffectSquare { index: 6, on: true }));
        assert!(leds.contains(&Feedback::EffectSquare {
            index: 0,
            on: false
        }));
        assert!(leds.contains(&Feedback::MuteSquare { index: 2, on: true }));
        assert_eq!(Some(&Feedback::Blackout(false)), leds.last());
    }

    #[test]
    fn test_surface_input_conversion() {
        assert_eq!(
            ControlEvent::ToggleMute { fader: 3 },
            ControlEvent::from(SurfaceInput::Mute(3))
        );
        assert_eq!(
            ControlEvent::ToggleEffect { index: 1 },
            ControlEvent::from(SurfaceInput::Effect(1))
        );
        assert_eq!(
            ControlEvent::ToggleBlackout,
            ControlEvent::from(SurfaceInput::Blackout)
        );
        assert_eq!(
            ControlEvent::Pad { row: 2, col: 5 },
            ControlEvent::from(SurfaceInput::Pad { row: 2, col: 5 })
        );
    }
}
