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
use std::{
    collections::HashMap,
    fmt,
    time::{Duration, Instant},
};

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::info;

use crate::fixture::{Color, DmxMode, Fixture, Group};


/// The shortest interval any effect steps at.
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Hue offset between neighbouring fixtures in the rainbow.
const RAINBOW_SPREAD: u32 = 30;

#[derive(Debug, thiserror::Error)]
pub enum EffectError {
    #[error("no effect at index {0}, expected 0..{count}", count = Effect::ALL.len())]
    UnknownEffect(usize),
}

/// The effects, in surface order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Every lit fixture alternates between white and black.
    StrobeWhite,
    /// Every lit fixture alternates between its own color and black.
    StrobeColor,
    /// Even and odd fixtures take turns.
    Alternate,
    /// One lit fixture at a time flashes white.
    Chase,
    /// A rotating hue spread across the rainbow groups.
    Rainbow,
    /// One hue rotating across every lit fixture.
    ColorWave,
    /// Lit fixtures drop out at random.
    RandomBlink,
    /// Every lit fixture breathes.
    Pulse,
}

impl Effect {
    pub const ALL: [Effect; 8] = [
        Effect::StrobeWhite,
        Effect::StrobeColor,
        Effect::Alternate,
        Effect::Chase,
        Effect::Rainbow,
        Effect::ColorWave,
        Effect::RandomBlink,
        Effect::Pulse,
    ];

    pub fn from_index(index: usize) -> Result<Effect, EffectError> {
        Effect::ALL
            .get(index)
            .copied()
            .ok_or(EffectError::UnknownEffect(index))
    }

    pub fn index(&self) -> usize {
        match self {
            Effect::StrobeWhite => 0,
            Effect::StrobeColor => 1,
            Effect::Alternate => 2,
            Effect::Chase => 3,
            Effect::Rainbow => 4,
            Effect::ColorWave => 5,
            Effect::RandomBlink => 6,
            Effect::Pulse => 7,
        }
    }

    /// The step interval at speed zero.
    pub fn base_interval(&self) -> Duration {
        Duration::from_millis(match self {
            Effect::StrobeWhite | Effect::StrobeColor => 100,
            Effect::Alternate => 150,
            Effect::Chase => 120,
            Effect::Rainbow | Effect::ColorWave => 50,
            Effect::RandomBlink => 200,
            Effect::Pulse => 30,
        })
    }

    /// Continuous effects keep their interval and take bigger steps as speed
    /// rises.
    pub fn is_continuous(&self) -> bool {
        matches!(self, Effect::Rainbow | Effect::ColorWave | Effect::Pulse)
    }

    /// The step interval at the given speed (0..=100).
    pub fn interval(&self, speed: u8) -> Duration {
        let base = self.base_interval();
        if self.is_continuous() {
            return base;
        }
        let factor = 1.0 - 0.95 * f64::from(speed.min(100)) / 100.0;
        base.mul_f64(factor).max(MIN_INTERVAL)
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Effect::StrobeWhite => "strobe white",
            Effect::StrobeColor => "strobe color",
            Effect::Alternate => "alternate",
            Effect::Chase => "chase",
            Effect::Rainbow => "rainbow",
            Effect::ColorWave => "color wave",
            Effect::RandomBlink => "random blink",
            Effect::Pulse => "pulse",
        })
    }
}

/// Immutable settings the engine is built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectContext {
    /// Groups the rainbow runs across.
    pub rainbow_groups: Vec<Group>,
}

impl Default for EffectContext {
    fn default() -> Self {
        EffectContext {
            rainbow_groups: vec![Group::Lat, Group::Contre],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Running(Effect),
}

/// Runs at most one effect at a time over the fixture list.
pub struct EffectEngine {
    context: EffectContext,
    state: State,
    speed: u8,
    /// Base color and color of every fixture when the effect started.
    saved: HashMap<String, (Color, Color)>,
    counter: u64,
    hue: u32,
    brightness: i32,
    direction: i32,
    last_step: Option<Instant>,
    rng: StdRng,
}

impl EffectEngine {
    pub fn new(context: EffectContext) -> EffectEngine {
        EffectEngine::with_rng(context, StdRng::from_entropy())
    }

    /// Creates an engine whose random blink is reproducible.
    pub fn with_seed(context: EffectContext, seed: u64) -> EffectEngine {
        EffectEngine::with_rng(context, StdRng::seed_from_u64(seed))
    }

    fn with_rng(context: EffectContext, rng: StdRng) -> EffectEngine {
        EffectEngine {
            context,
            state: State::Idle,
            speed: 0,
            saved: HashMap::new(),
            counter: 0,
            hue: 0,
            brightness: 0,
            direction: 1,
            last_step: None,
            rng,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn active(&self) -> Option<Effect> {
        match self.state {
            State::Idle => None,
            State::Running(effect) => Some(effect),
        }
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: u8) {
        self.speed = speed.min(100);
    }

    /// The step interval of the running effect.
    pub fn interval(&self) -> Option<Duration> {
        self.active().map(|effect| effect.interval(self.speed))
    }

    /// Starts an effect. A different running effect is stopped first, so the
    /// new one starts from the colors as they were before any effect.
    pub fn activate(&mut self, effect: Effect, fixtures: &mut [Fixture]) {
        if self.active().is_some() {
            self.deactivate(fixtures);
        }

        self.saved = fixtures
            .iter()
            .map(|fixture| (fixture.id.clone(), (fixture.base_color, fixture.color)))
            .collect();
        self.counter = 0;
        self.hue = 0;
        self.brightness = 0;
        self.direction = 1;
        self.last_step = None;

        if effect == Effect::StrobeWhite {
            for fixture in fixtures.iter_mut() {
                fixture.dmx_mode = DmxMode::Strobe;
            }
        }

        self.state = State::Running(effect);
        info!(effect = %effect, speed = self.speed, "Effect started.");
    }

    /// Stops the running effect and restores every fixture's colors. Returns
    /// false if nothing was running.
    pub fn deactivate(&mut self, fixtures: &mut [Fixture]) -> bool {
        let State::Running(effect) = self.state else {
            return false;
        };

        for fixture in fixtures.iter_mut() {
            fixture.dmx_mode = DmxMode::Manual;
            if let Some((base_color, color)) = self.saved.remove(&fixture.id) {
                fixture.base_color = base_color;
                fixture.color = color;
            }
        }
        self.saved.clear();
        self.last_step = None;
        self.state = State::Idle;
        info!(effect = %effect, "Effect stopped.");
        true
    }

    /// Starts the effect at `index`, or stops it if it is the one running.
    pub fn toggle(
        &mut self,
        index: usize,
        fixtures: &mut [Fixture],
    ) -> Result<State, EffectError> {
        let effect = Effect::from_index(index)?;
        if self.active() == Some(effect) {
            self.deactivate(fixtures);
        } else {
            self.activate(effect, fixtures);
        }
        Ok(self.state)
    }

    /// Steps the running effect if its interval has elapsed since the last
    /// step. Returns true if fixtures were changed.
    pub fn advance(&mut self, fixtures: &mut [Fixture], now: Instant) -> bool {
        let Some(interval) = self.interval() else {
            return false;
        };
        if let Some(last) = self.last_step {
            if now.saturating_duration_since(last) < interval {
                return false;
            }
        }
        self.step(fixtures);
        self.last_step = Some(now);
        true
    }

    /// Steps the running effect once, regardless of timing.
    pub fn step(&mut self, fixtures: &mut [Fixture]) {
        let Some(effect) = self.active() else {
            return;
        };

        match effect {
            Effect::StrobeWhite => {
                let color = if self.counter % 2 == 0 {
                    Color::WHITE
                } else {
                    Color::BLACK
                };
                for fixture in fixtures.iter_mut().filter(|f| f.is_lit()) {
                    fixture.color = color;
                }
                self.counter += 1;
            }
            Effect::StrobeColor => {
                let on = self.counter % 2 == 0;
                for fixture in fixtures.iter_mut().filter(|f| f.is_lit()) {
                    fixture.color = if on {
                        fixture.scaled_base()
                    } else {
                        Color::BLACK
                    };
                }
                self.counter += 1;
            }
            Effect::Alternate => {
                let lit_parity = self.counter % 2;
                for (index, fixture) in fixtures.iter_mut().enumerate() {
                    if !fixture.is_lit() {
                        continue;
                    }
                    fixture.color = if index as u64 % 2 == lit_parity {
                        fixture.scaled_base()
                    } else {
                        Color::BLACK
                    };
                }
                self.counter += 1;
            }
            Effect::Chase => {
                let lit = fixtures.iter().filter(|f| f.is_lit()).count() as u64;
                if lit > 0 {
                    let target = self.counter % lit;
                    for (position, fixture) in
                        fixtures.iter_mut().filter(|f| f.is_lit()).enumerate()
                    {
                        fixture.color = if position as u64 == target {
                            Color::WHITE
                        } else {
                            fixture.scaled_base()
                        };
                    }
                }
                self.counter += 1;
            }
            Effect::Rainbow => {
                for (index, fixture) in fixtures.iter_mut().enumerate() {
                    if !fixture.is_lit() || !self.context.rainbow_groups.contains(&fixture.group) {
                        continue;
                    }
                    let hue = (self.hue + index as u32 * RAINBOW_SPREAD) % 360;
                    fixture.color = hue_at_level(hue, fixture.level);
                }
                self.hue = (self.hue + self.hue_step()) % 360;
            }
            Effect::ColorWave => {
                for fixture in fixtures.iter_mut().filter(|f| f.is_lit()) {
                    fixture.color = hue_at_level(self.hue, fixture.level);
                }
                self.hue = (self.hue + self.hue_step()) % 360;
            }
            Effect::RandomBlink => {
                for fixture in fixtures.iter_mut().filter(|f| f.is_lit()) {
                    fixture.color = if self.rng.gen_bool(0.5) {
                        Color::BLACK
                    } else {
                        fixture.scaled_base()
                    };
                }
            }
            Effect::Pulse => {
                let brightness = f64::from(self.brightness) / 100.0;
                for fixture in fixtures.iter_mut().filter(|f| f.is_lit()) {
                    let level = f64::from(fixture.level) / 100.0;
                    fixture.color = fixture.base_color.scale(level * brightness);
                }

                self.brightness += self.direction * self.pulse_step();
                if self.brightness >= 100 {
                    self.brightness = 100;
                    self.direction = -1;
                } else if self.brightness <= 0 {
                    self.brightness = 0;
                    self.direction = 1;
                }
            }
        }
    }

    fn hue_step(&self) -> u32 {
        (5.0 * (1.0 + f64::from(self.speed) / 30.0)) as u32
    }

    fn pulse_step(&self) -> i32 {
        2 + i32::from(self.speed) / 20
    }
}

fn hue_at_level(hue: u32, level: u8) -> Color {
    Color::from_hsv(f64::from(hue), 1.0, 1.0).scale(f64::from(level) / 100.0)
}
