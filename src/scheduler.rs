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
    error::Error,
    path::{Path, PathBuf},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use serde::Serialize;
use tokio::{
    select,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, error, info, span, warn, Level};

use crate::{
    config::{ConfigError, Padlight, DEFAULT_POLL_INTERVAL},
    console::{Console, ControlError, ControlEvent, Outcome},
    dmx::{ArtNet, Transmitter, Universe},
    effects::EffectEngine,
    fixture::{Delta, Edit, FixtureRegistry, FixtureSnapshot},
    midi::{self, MidiBridge},
    patch::{Mode, PatchResolver},
};

/// Timing and persistence settings for the host loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// The DMX tick.
    pub interval: Duration,
    /// The MIDI poll tick.
    pub poll_interval: Duration,
    pub patch_file: Option<PathBuf>,
}

/// What the core exposes for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub connected: bool,
    /// Ids of fixtures sharing channels with another fixture.
    pub conflicts: Vec<String>,
    pub fixtures: Vec<FixtureSnapshot>,
}

/// Owns all lighting state and drives it from two ticks. Everything runs on
/// one thread, so nothing here is shared or locked.
pub struct Scheduler {
    registry: FixtureRegistry,
    resolver: PatchResolver,
    universe: Universe,
    transmitter: Box<dyn Transmitter>,
    console: Console,
    effects: EffectEngine,
    midi: Option<MidiBridge>,
    settings: Settings,
    /// Whether the last send went out. Failures are logged on change only.
    sending: bool,
}

impl Scheduler {
    pub fn new(
        registry: FixtureRegistry,
        resolver: PatchResolver,
        transmitter: Box<dyn Transmitter>,
        console: Console,
        effects: EffectEngine,
        midi: Option<MidiBridge>,
        settings: Settings,
    ) -> Scheduler {
        Scheduler {
            registry,
            resolver,
            universe: Universe::new(),
            transmitter,
            console,
            effects,
            midi,
            settings,
            sending: true,
        }
    }

    /// Builds a scheduler from the configuration. Nothing is connected yet.
    pub fn from_config(config: &Padlight) -> Result<Scheduler, ConfigError> {
        let artnet = config.artnet();
        let mut registry = config.registry();
        let resolver = config.patch(registry.fixtures_mut())?;
        let layout = config.layout()?;
        let effects = EffectEngine::new(layout.effect_context());

        let midi = config
            .midi()
            .map(|midi| MidiBridge::new(midi::backend(midi.device()), midi.device()));
        let poll_interval = match config.midi() {
            Some(midi) => midi.poll_interval()?,
            None => DEFAULT_POLL_INTERVAL,
        };

        let transmitter = ArtNet::new(artnet.target_ip()?, artnet.target_port(), artnet.universe());
        info!(
            fixtures = registry.len(),
            target = %transmitter.target(),
            "Scheduler configured."
        );

        Ok(Scheduler::new(
            registry,
            resolver,
            Box::new(transmitter),
            Console::new(layout),
            effects,
            midi,
            Settings {
                interval: artnet.interval()?,
                poll_interval,
                patch_file: config.patch_file().map(Path::to_path_buf),
            },
        ))
    }

    pub fn registry(&self) -> &FixtureRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &PatchResolver {
        &self.resolver
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn effects(&self) -> &EffectEngine {
        &self.effects
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Opens the Art-Net output.
    pub fn connect(&mut self) -> bool {
        self.sending = true;
        self.transmitter.connect()
    }

    pub fn disconnect(&mut self) {
        self.transmitter.disconnect();
    }

    /// Reopens the MIDI surface and brings its LEDs in line with the current
    /// state. Returns whether the surface is available.
    pub fn reconnect_midi(&mut self) -> bool {
        let Some(midi) = self.midi.as_mut() else {
            debug!("No MIDI surface configured.");
            return false;
        };

        if !midi.reconnect() {
            return false;
        }
        midi.write(&self.console.led_state(&self.effects));
        midi.is_available()
    }

    /// Applies a control event and writes its LED feedback right away.
    pub fn apply(&mut self, event: ControlEvent) -> Result<Outcome, ControlError> {
        let outcome = self
            .console
            .apply(event, &mut self.registry, &mut self.effects)?;

        if outcome.delta == Delta::Patch {
            self.resolver.mark_dirty();
        }
        if let Some(midi) = self.midi.as_mut() {
            midi.write(&outcome.feedback);
        }
        Ok(outcome)
    }

    /// Switches a fixture's channel mode.
    pub fn set_mode(&mut self, id: &str, mode: Mode) -> Result<Delta, ControlError> {
        self.apply(ControlEvent::Edit(Edit::SetProfile {
            id: id.to_string(),
            mode,
        }))
        .map(|outcome| outcome.delta)
    }

    /// Runs one DMX frame: advances the effect, rebuilds the patch if it
    /// changed, renders the universe and sends it. `clock` phases the software
    /// strobe. Returns whether the frame went out.
    pub fn dmx_tick(&mut self, now: Instant, clock: Duration) -> bool {
        let started = Instant::now();

        if self.effects.advance(self.registry.fixtures_mut(), now) {
            self.console.hold_blackout(self.registry.fixtures_mut());
        }
        self.resolver.refresh(self.registry.fixtures());
        self.universe.update_from(
            self.registry.fixtures(),
            self.resolver.channel_map(),
            self.effects.speed(),
            clock,
        );

        let sent = self.transmitter.send(&self.universe);
        if sent != self.sending {
            if sent {
                info!("Art-Net output recovered.");
            } else {
                warn!(
                    connected = self.transmitter.is_connected(),
                    "Art-Net frames are not going out."
                );
            }
            self.sending = sent;
        }

        let elapsed = started.elapsed();
        if elapsed > self.settings.interval {
            warn!(
                elapsed = ?elapsed,
                interval = ?self.settings.interval,
                "DMX tick overran its interval."
            );
        }
        sent
    }

    /// Drains pending surface input and applies it. Returns how many inputs
    /// were handled.
    pub fn midi_tick(&mut self) -> usize {
        let inputs = match self.midi.as_mut() {
            Some(midi) => midi.poll(),
            None => return 0,
        };

        let count = inputs.len();
        for input in inputs {
            if let Err(e) = self.apply(ControlEvent::from(input)) {
                warn!(err = e.to_string(), "Ignoring surface input.");
            }
        }
        count
    }

    pub fn status(&self) -> Status {
        let fixtures = self.registry.fixtures();
        Status {
            connected: self.transmitter.is_connected(),
            conflicts: self
                .resolver
                .conflicts()
                .iter()
                .filter_map(|index| fixtures.get(*index))
                .map(|fixture| fixture.id.clone())
                .collect(),
            fixtures: fixtures.iter().map(|fixture| fixture.snapshot()).collect(),
        }
    }

    /// Writes the current patch document. Does nothing without a patch file.
    pub fn save_patch(&mut self) -> Result<(), ConfigError> {
        let Some(path) = self.settings.patch_file.as_ref() else {
            return Ok(());
        };

        self.resolver.refresh(self.registry.fixtures());
        self.resolver.document().save(path)
    }

    /// Sends a blackout frame, saves the patch and closes everything.
    pub fn shutdown(&mut self) {
        let span = span!(Level::INFO, "shutdown");
        let _enter = span.enter();

        self.universe.blackout();
        if !self.transmitter.send(&self.universe) {
            warn!("Unable to send the blackout frame.");
        }
        if let Err(e) = self.save_patch() {
            error!(err = e.to_string(), "Unable to save the patch.");
        }
        self.transmitter.disconnect();
        if let Some(midi) = self.midi.as_mut() {
            midi.close();
        }
    }

    /// Runs both ticks until Ctrl-C. SIGHUP reconnects the MIDI surface.
    pub async fn run(mut self) -> Result<(), Box<dyn Error>> {
        let mut dmx = time::interval(self.settings.interval);
        dmx.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut poll = time::interval(self.settings.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut hangup = hangup::Hangup::new()?;
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        info!(
            interval = ?self.settings.interval,
            poll_interval = ?self.settings.poll_interval,
            "Running."
        );
        loop {
            select! {
                _ = dmx.tick() => {
                    self.dmx_tick(Instant::now(), wall_clock());
                }
                _ = poll.tick() => {
                    self.midi_tick();
                }
                _ = hangup.recv() => {
                    info!("Received SIGHUP, reconnecting the MIDI surface.");
                    self.reconnect_midi();
                }
                result = &mut ctrl_c => {
                    result?;
                    info!("Received Ctrl-C, shutting down.");
                    break;
                }
            }
        }

        self.shutdown();
        Ok(())
    }
}

/// Time since the epoch, which phases the software strobe.
pub fn wall_clock() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

#[cfg(unix)]
mod hangup {
    use tokio::signal::unix::{signal, Signal, SignalKind};

    pub struct Hangup(Signal);

    impl Hangup {
        pub fn new() -> std::io::Result<Hangup> {
            Ok(Hangup(signal(SignalKind::hangup())?))
        }

        pub async fn recv(&mut self) {
            if self.0.recv().await.is_none() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
mod hangup {
    pub struct Hangup;

    impl Hangup {
        pub fn new() -> std::io::Result<Hangup> {
            Ok(Hangup)
        }

        pub async fn recv(&mut self) {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;
    use crate::{
        config::PatchDocument,
        console::Layout,
        dmx::test::MockTransmitter,
        fixture::{FixtureType, Group},
        midi::{MockBackend, MockPort},
    };

    const DATA: usize = 18;

    struct Rig {
        scheduler: Scheduler,
        transmitter: MockTransmitter,
        port: MockPort,
    }

    fn rig(patch_file: Option<PathBuf>) -> Rig {
        let mut registry = FixtureRegistry::new();
        registry.add(
            Group::Face,
            None,
            FixtureType::ParLed,
            Mode::Five,
            Some(1),
        );
        registry.add(
            Group::Douche1,
            None,
            FixtureType::ParLed,
            Mode::Five,
            Some(6),
        );

        let layout = Layout::default();
        let effects = EffectEngine::with_seed(layout.effect_context(), 7);
        let transmitter = MockTransmitter::new();
        let backend = MockBackend::new("mock apc");
        let port = backend.port();

        let scheduler = Scheduler::new(
            registry,
            PatchResolver::new(),
            Box::new(transmitter.clone()),
            Console::new(layout),
            effects,
            Some(MidiBridge::new(Box::new(backend), "apc")),
            Settings {
                interval: Duration::from_millis(40),
                poll_interval: Duration::from_millis(10),
                patch_file,
            },
        );
        Rig {
            scheduler,
            transmitter,
            port,
        }
    }

    fn frame(transmitter: &MockTransmitter, start: usize, len: usize) -> Vec<u8> {
        let packet = transmitter.last_packet().unwrap();
        packet[DATA + start - 1..DATA + start - 1 + len].to_vec()
    }

    #[test]
    fn test_dmx_tick_renders_fader() {
        let mut rig = rig(None);
        assert!(rig.scheduler.connect());
        rig.scheduler
            .apply(ControlEvent::Fader {
                index: 0,
                value: 50,
            })
            .unwrap();

        assert!(rig.scheduler.dmx_tick(Instant::now(), Duration::ZERO));
        assert_eq!(1, rig.transmitter.packet_count());
        assert_eq!(vec![127, 127, 127, 128, 0], frame(&rig.transmitter, 1, 5));
        assert_eq!(vec![0; 5], frame(&rig.transmitter, 6, 5));
    }

    #[test]
    fn test_dmx_tick_without_connection() {
        let mut rig = rig(None);
        assert!(!rig.scheduler.dmx_tick(Instant::now(), Duration::ZERO));
        assert_eq!(0, rig.transmitter.packet_count());

        rig.scheduler.connect();
        rig.transmitter.set_failing(true);
        assert!(!rig.scheduler.dmx_tick(Instant::now(), Duration::ZERO));
        rig.transmitter.set_failing(false);
        assert!(rig.scheduler.dmx_tick(Instant::now(), Duration::ZERO));
        assert_eq!(1, rig.transmitter.packet_count());
    }

    #[test]
    fn test_edits_repatch() {
        let mut rig = rig(None);
        rig.scheduler.connect();
        rig.scheduler
            .apply(ControlEvent::Fader {
                index: 0,
                value: 100,
            })
            .unwrap();

        let outcome = rig
            .scheduler
            .apply(ControlEvent::Edit(Edit::SetAddress {
                id: "face_0".to_string(),
                address: 100,
            }))
            .unwrap();
        assert_eq!(Delta::Patch, outcome.delta);
        assert!(rig.scheduler.resolver().is_dirty());

        rig.scheduler.dmx_tick(Instant::now(), Duration::ZERO);
        assert_eq!(vec![0; 5], frame(&rig.transmitter, 1, 5));
        assert_eq!(vec![255, 255, 255, 255, 0], frame(&rig.transmitter, 100, 5));

        assert_eq!(
            Delta::Patch,
            rig.scheduler.set_mode("face_0", Mode::Six).unwrap()
        );
        rig.scheduler.dmx_tick(Instant::now(), Duration::ZERO);
        assert_eq!(
            vec![255, 255, 255, 0, 0, 0],
            frame(&rig.transmitter, 100, 6)
        );
        assert!(rig.scheduler.set_mode("missing", Mode::Six).is_err());
    }

    #[test]
    fn test_midi_tick_applies_input() {
        let mut rig = rig(None);
        assert!(rig.scheduler.reconnect_midi());
        rig.port.take_sent();

        rig.port.inject(&[0xB0, 48, 127]);
        rig.port.inject(&[0x90, 70, 127]);
        rig.port.inject(&[0x90, 122, 127]);
        assert_eq!(2, rig.scheduler.midi_tick());

        assert_eq!(Some(100), rig.scheduler.console().fader(0));
        assert!(rig.scheduler.console().is_blackout());

        // Eight pad LEDs for the auto-picked color, then the blackout square.
        let sent = rig.port.take_sent();
        assert_eq!(9, sent.len());
        assert_eq!(vec![0x96, 56, 3], sent[0]);
        assert_eq!(vec![0x90, 122, 3], sent[8]);
        assert_eq!(0, rig.scheduler.midi_tick());
    }

    #[test]
    fn test_reconnect_writes_led_state() {
        let mut rig = rig(None);
        assert!(rig.scheduler.reconnect_midi());
        assert_eq!(1, rig.port.opened());

        // Pads cleared, every pad lit, effect squares, mute squares, blackout.
        let sent = rig.port.take_sent();
        assert_eq!(64 + 64 + 8 + 8 + 1, sent.len());
        assert!(sent[..64].iter().all(|message| message[2] == 0));
    }

    #[test]
    fn test_midi_unavailable() {
        let mut registry = FixtureRegistry::new();
        registry.add(Group::Face, None, FixtureType::ParLed, Mode::Five, None);
        let layout = Layout::default();
        let effects = EffectEngine::with_seed(layout.effect_context(), 7);
        let transmitter = MockTransmitter::new();
        let backend = MockBackend::new("mock apc");
        backend.set_available(false);

        let mut scheduler = Scheduler::new(
            registry,
            PatchResolver::new(),
            Box::new(transmitter.clone()),
            Console::new(layout),
            effects,
            Some(MidiBridge::new(Box::new(backend), "apc")),
            Settings {
                interval: Duration::from_millis(40),
                poll_interval: Duration::from_millis(10),
                patch_file: None,
            },
        );

        assert!(!scheduler.reconnect_midi());
        assert_eq!(0, scheduler.midi_tick());
        scheduler.connect();
        scheduler
            .apply(ControlEvent::Fader {
                index: 0,
                value: 100,
            })
            .unwrap();
        assert!(scheduler.dmx_tick(Instant::now(), Duration::ZERO));
        assert_eq!(vec![255, 255, 255, 255, 0], frame(&transmitter, 1, 5));
    }

    #[test]
    fn test_effect_runs_on_dmx_tick() {
        let mut rig = rig(None);
        rig.scheduler.connect();
        rig.scheduler
            .apply(ControlEvent::Fader {
                index: 0,
                value: 100,
            })
            .unwrap();
        rig.scheduler
            .apply(ControlEvent::Pad { row: 1, col: 0 })
            .unwrap();
        rig.scheduler
            .apply(ControlEvent::ToggleEffect { index: 1 })
            .unwrap();

        // Strobe color: the first step blacks out, the next restores.
        let start = Instant::now();
        rig.scheduler.dmx_tick(start, Duration::ZERO);
        let first = frame(&rig.transmitter, 1, 3);
        rig.scheduler.dmx_tick(start + Duration::from_secs(1), Duration::ZERO);
        let second = frame(&rig.transmitter, 1, 3);
        assert_ne!(first, second);
        assert!(first == vec![0, 0, 0] || second == vec![0, 0, 0]);
        assert!(first == vec![255, 0, 0] || second == vec![255, 0, 0]);
    }

    #[test]
    fn test_blackout_holds_through_effect_stop() {
        let mut rig = rig(None);
        rig.scheduler.connect();
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
            rig.scheduler.apply(event).unwrap();
        }

        let start = Instant::now();
        rig.scheduler.dmx_tick(start, Duration::ZERO);
        assert_eq!(vec![0, 0, 0, 0], frame(&rig.transmitter, 1, 4));

        rig.scheduler
            .apply(ControlEvent::ToggleEffect { index: 7 })
            .unwrap();
        rig.scheduler
            .dmx_tick(start + Duration::from_millis(40), Duration::ZERO);
        assert!(rig.scheduler.console().is_blackout());
        assert_eq!(vec![0, 0, 0, 0], frame(&rig.transmitter, 1, 4));

        rig.scheduler.apply(ControlEvent::ToggleBlackout).unwrap();
        rig.scheduler
            .dmx_tick(start + Duration::from_millis(80), Duration::ZERO);
        assert_eq!(vec![255, 0, 0, 255], frame(&rig.transmitter, 1, 4));
    }

    #[test]
    fn test_status() {
        let mut rig = rig(None);
        rig.scheduler
            .apply(ControlEvent::Edit(Edit::SetAddress {
                id: "douche1_1".to_string(),
                address: 3,
            }))
            .unwrap();
        rig.scheduler.dmx_tick(Instant::now(), Duration::ZERO);

        let status = rig.scheduler.status();
        assert!(!status.connected);
        assert_eq!(vec!["face_0", "douche1_1"], status.conflicts);
        assert_eq!(2, status.fixtures.len());
        assert_eq!("face_0", status.fixtures[0].id);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(Some(false), json["connected"].as_bool());
        assert_eq!("face_0", json["fixtures"][0]["id"]);
    }

    #[test]
    fn test_shutdown_blacks_out_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patch.json");
        let mut rig = rig(Some(path.clone()));
        rig.scheduler.connect();
        rig.scheduler
            .apply(ControlEvent::Fader {
                index: 0,
                value: 100,
            })
            .unwrap();
        rig.scheduler.dmx_tick(Instant::now(), Duration::ZERO);
        assert_eq!(vec![255, 255, 255], frame(&rig.transmitter, 1, 3));

        rig.scheduler.shutdown();
        assert_eq!(vec![0; 10], frame(&rig.transmitter, 1, 10));
        assert!(!rig.transmitter.is_connected());

        let document = PatchDocument::load(&path).unwrap();
        assert_eq!(
            vec!["douche1_1".to_string(), "face_0".to_string()],
            document.channels.keys().cloned().collect::<Vec<String>>()
        );
        assert_eq!(Some(&Mode::Five), document.modes.get("face_0"));
        assert!(fs::read_to_string(&path).unwrap().ends_with("}\n"));
    }
}
