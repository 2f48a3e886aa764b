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
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

use tracing::{debug, info, span, warn, Level};

use super::universe::{Universe, UNIVERSE_SIZE};

/// The default Art-Net UDP port.
pub const ARTNET_PORT: u16 = 6454;

/// Header plus one full universe.
pub const PACKET_SIZE: usize = HEADER_SIZE + UNIVERSE_SIZE;

const HEADER_SIZE: usize = 18;
const ARTNET_ID: &[u8; 8] = b"Art-Net\0";
const OP_DMX: u16 = 0x5000;
const PROTOCOL_VERSION: u16 = 14;

/// Encodes an ArtDMX packet.
pub fn encode_packet(
    data: &[u8; UNIVERSE_SIZE],
    universe: u16,
    sequence: u8,
) -> [u8; PACKET_SIZE] {
    let mut packet = [0u8; PACKET_SIZE];

    packet[0..8].copy_from_slice(ARTNET_ID);
    packet[8..10].copy_from_slice(&OP_DMX.to_le_bytes());
    packet[10..12].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    packet[12] = sequence;
    // Physical input port, unused.
    packet[13] = 0;
    packet[14..16].copy_from_slice(&universe.to_le_bytes());
    packet[16..18].copy_from_slice(&(UNIVERSE_SIZE as u16).to_be_bytes());
    packet[HEADER_SIZE..].copy_from_slice(data);

    packet
}

/// Something that puts a universe on the wire. Failures are reported as
/// `false`, never as errors, so a caller on a fixed cadence can simply retry
/// on the next tick.
pub trait Transmitter {
    /// Opens the transport, replacing any existing one.
    fn connect(&mut self) -> bool;

    /// Closes the transport. Does nothing if already closed.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// Sends the universe.
    fn send(&mut self, universe: &Universe) -> bool;

    /// The sequence number the next packet will carry.
    fn sequence(&self) -> u8;
}

/// Sends ArtDMX packets over a broadcast-capable UDP socket.
pub struct ArtNet {
    target: SocketAddr,
    universe: u16,
    sequence: u8,
    socket: Option<UdpSocket>,
}

impl ArtNet {
    pub fn new(target_ip: Ipv4Addr, target_port: u16, universe: u16) -> ArtNet {
        ArtNet {
            target: SocketAddr::V4(SocketAddrV4::new(target_ip, target_port)),
            universe,
            sequence: 0,
            socket: None,
        }
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    fn open_socket() -> std::io::Result<UdpSocket> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.set_broadcast(true)?;
        socket.set_nonblocking(true)?;
        Ok(socket)
    }
}

impl Transmitter for ArtNet {
    fn connect(&mut self) -> bool {
        let span = span!(Level::INFO, "artnet connect");
        let _enter = span.enter();

        match ArtNet::open_socket() {
            Ok(socket) => {
                self.socket = Some(socket);
                info!(
                    target = %self.target,
                    universe = self.universe,
                    "Art-Net output connected."
                );
                true
            }
            Err(e) => {
                self.socket = None;
                warn!(err = e.to_string(), "Unable to open Art-Net socket.");
                false
            }
        }
    }

    fn disconnect(&mut self) {
        if self.socket.take().is_some() {
            info!(target = %self.target, "Art-Net output disconnected.");
        }
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    fn send(&mut self, universe: &Universe) -> bool {
        let Some(socket) = self.socket.as_ref() else {
            return false;
        };

        let packet = encode_packet(universe.as_slice(), self.universe, self.sequence);
        match socket.send_to(&packet, self.target) {
            Ok(_) => {
                self.sequence = self.sequence.wrapping_add(1);
                true
            }
            Err(e) => {
                debug!(err = e.to_string(), "Art-Net send failed.");
                false
            }
        }
    }

    fn sequence(&self) -> u8 {
        self.sequence
    }
}

#[cfg(test)]
pub mod mock {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::{encode_packet, Transmitter, PACKET_SIZE};
    use crate::dmx::universe::Universe;

    #[derive(Default)]
    struct State {
        connected: bool,
        failing: bool,
        sequence: u8,
        packets: Vec<[u8; PACKET_SIZE]>,
    }

    /// Records packets instead of sending them. Clones share state.
    #[derive(Clone, Default)]
    pub struct MockTransmitter {
        state: Arc<Mutex<State>>,
    }

    impl MockTransmitter {
        pub fn new() -> MockTransmitter {
            MockTransmitter::default()
        }

        /// Makes every following send fail until cleared.
        pub fn set_failing(&self, failing: bool) {
            self.state.lock().failing = failing;
        }

        pub fn packet_count(&self) -> usize {
            self.state.lock().packets.len()
        }

        pub fn last_packet(&self) -> Option<[u8; PACKET_SIZE]> {
            self.state.lock().packets.last().copied()
        }
    }

    impl Transmitter for MockTransmitter {
        fn connect(&mut self) -> bool {
            self.state.lock().connected = true;
            true
        }

        fn disconnect(&mut self) {
            self.state.lock().connected = false;
        }

        fn is_connected(&self) -> bool {
            self.state.lock().connected
        }

        fn send(&mut self, universe: &Universe) -> bool {
            let mut state = self.state.lock();
            if !state.connected || state.failing {
                return false;
            }
            let packet = encode_packet(universe.as_slice(), 0, state.sequence);
            state.packets.push(packet);
            state.sequence = state.sequence.wrapping_add(1);
            true
        }

        fn sequence(&self) -> u8 {
            self.state.lock().sequence
        }
    }
}

#[cfg(test)]
mod test {
    use std::{net::UdpSocket, time::Duration};

    use super::*;

    #[test]
    fn test_packet_shape() {
        let mut data = [0u8; UNIVERSE_SIZE];
        data[0] = 255;
        data[511] = 7;

        let packet = encode_packet(&data, 0x0102, 9);
        assert_eq!(530, packet.len());
        assert_eq!(b"Art-Net\0", &packet[0..8]);
        assert_eq!([0x00, 0x50], packet[8..10]);
        assert_eq!([0x00, 0x0e], packet[10..12]);
        assert_eq!(9, packet[12]);
        assert_eq!(0, packet[13]);
        assert_eq!([0x02, 0x01], packet[14..16]);
        assert_eq!([0x02, 0x00], packet[16..18]);
        assert_eq!(255, packet[18]);
        assert_eq!(7, packet[529]);
    }

    #[test]
    fn test_send_without_connect() {
        let mut artnet = ArtNet::new(Ipv4Addr::LOCALHOST, ARTNET_PORT, 0);
        assert!(!artnet.is_connected());
        assert!(!artnet.send(&Universe::new()));
        assert_eq!(0, artnet.sequence());
    }

    #[test]
    fn test_sequence_wraps_over_loopback() -> Result<(), Box<dyn std::error::Error>> {
        let receiver = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0))?;
        receiver.set_read_timeout(Some(Duration::from_secs(2)))?;
        let port = receiver.local_addr()?.port();

        let mut artnet = ArtNet::new(Ipv4Addr::LOCALHOST, port, 3);
        assert!(artnet.connect());
        // Connecting again replaces the socket.
        assert!(artnet.connect());

        let mut universe = Universe::new();
        universe.set_channel(1, 200);

        let mut sequences = Vec::with_capacity(300);
        let mut buf = [0u8; 1024];
        for _ in 0..300 {
            assert!(artnet.send(&universe));
            let (len, _) = receiver.recv_from(&mut buf)?;
            assert_eq!(PACKET_SIZE, len);
            assert_eq!([3, 0], buf[14..16]);
            assert_eq!(200, buf[18]);
            sequences.push(buf[12]);
        }

        let expected: Vec<u8> = (0..=255u8).chain(0..=43u8).collect();
        assert_eq!(expected, sequences);

        artnet.disconnect();
        assert!(!artnet.is_connected());
        assert!(!artnet.send(&universe));
        Ok(())
    }
}
