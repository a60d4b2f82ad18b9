//! Peer-to-peer 2.4 GHz radio layer.
//!
//! The driver owns a fixed ring of packet slots shared with the receive
//! interrupt (see [`ring::PacketRing`]) and a small state machine over the
//! hardware, reached through the [`RadioHw`] trait. On top of the raw
//! 32-byte packets sits the MakeCode-compatible typed message layer
//! ([`frame`]), so bloq devices and MakeCode devices on the same group and
//! channel understand each other.

use bloq_types::Word;

use crate::consts::{
    MAX_RADIO_STRING, PACKET_LEN, RADIO_BASE_ADDRESS, RADIO_DEFAULT_CHANNEL,
    RADIO_DEFAULT_POWER, RADIO_WHITENING_IV,
};

pub mod frame;
mod ring;

#[cfg(any(test, feature = "test-helpers"))]
mod loopback;

#[cfg(any(test, feature = "test-helpers"))]
pub use loopback::LoopbackRadio;
pub use ring::PacketRing;

use frame::Payload;

bitflags::bitflags! {
    /// Latched hardware event lines the driver watches.
    pub struct RadioEvents: u32 {
        /// Radio ramped up and is ready to start.
        const READY = 1 << 0;
        /// A packet finished (reception or transmission).
        const END = 1 << 1;
        /// The finished packet failed its CRC check.
        const CRC_ERROR = 1 << 2;
    }
}

/// Physical-layer parameters applied on first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RadioConfig {
    /// Common base address; the ASCII bytes `'uBit'`.
    pub base_address: u32,
    /// Group prefix appended to the base address.
    pub group: u8,
    /// Channel 0..=83, i.e. 2400 + n MHz.
    pub channel: u8,
    /// Transmit power 0..=7.
    pub power: u8,
    /// Whitening initialization vector.
    pub whitening_iv: u8,
    /// Largest payload accepted, in bytes.
    pub max_payload: u8,
}

impl Default for RadioConfig {
    fn default() -> Self {
        RadioConfig {
            base_address: RADIO_BASE_ADDRESS,
            group: 0,
            channel: RADIO_DEFAULT_CHANNEL,
            power: RADIO_DEFAULT_POWER,
            whitening_iv: RADIO_WHITENING_IV,
            max_payload: PACKET_LEN as u8,
        }
    }
}

/// Driver state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RadioState {
    /// Hardware untouched; first use initializes lazily.
    #[default]
    Uninitialized,
    /// Listening; the interrupt fills the ring.
    Receiving,
    /// Mid-transmission; sends are synchronous.
    Transmitting,
    /// Receiver disabled, e.g. across a channel change.
    Disabled,
}

/// Register-level surface of the radio peripheral.
///
/// The firmware build implements this over the nRF51 registers; tests and
/// host simulations use [`LoopbackRadio`]. Sends block until the END event,
/// matching the synchronous transmit path of the reference hardware.
pub trait RadioHw {
    /// Start the high-frequency clock and power the peripheral.
    fn power_up(&mut self);
    /// Apply addressing, rate, CRC and whitening configuration.
    fn apply(&mut self, config: &RadioConfig);
    /// Retune to a channel, receiver disabled.
    fn set_channel(&mut self, channel: u8);
    /// Change transmit power in place.
    fn set_power(&mut self, power: u8);
    /// Change the group prefix in place.
    fn set_group(&mut self, group: u8);
    /// Enter receive mode.
    fn enable_rx(&mut self);
    /// Disable the transceiver.
    fn disable(&mut self);
    /// Synchronous send: ramp up, start, block until END, ramp down.
    fn transmit(&mut self, packet: &[u8; PACKET_LEN]);
    /// Take and clear the latched event lines.
    fn take_events(&mut self) -> RadioEvents;
    /// Copy the packet behind the last END event into `into`.
    fn read_packet(&mut self, into: &mut [u8; PACKET_LEN]);
    /// Signal-strength sample of the last reception, as a positive dBm
    /// magnitude.
    fn rssi_sample(&self) -> i32;
    /// Stable per-device identifier from the firmware information block.
    fn device_id(&self) -> u32;
    /// Milliseconds since start.
    fn millis(&self) -> u32;
}

/// Message kind of the last received MakeCode frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageKind {
    /// Nothing received yet.
    #[default]
    None,
    /// An integer (or rounded double).
    Integer,
    /// A string.
    Str,
    /// A named value: string plus integer.
    Pair,
}

impl MessageKind {
    /// The type name user programs see.
    pub const fn name(self) -> &'static str {
        match self {
            MessageKind::None => "",
            MessageKind::Integer => "number",
            MessageKind::Str => "string",
            MessageKind::Pair => "pair",
        }
    }
}

/// Fields of the last received typed message, kept in fixed storage so the
/// receive path never touches the arena.
#[derive(Debug, Clone, Copy)]
pub struct Received {
    /// Kind of the last message.
    pub kind: MessageKind,
    /// Integer payload, when the kind carries one.
    pub integer: i32,
    /// String payload bytes, capped at [`MAX_RADIO_STRING`].
    text: [u8; MAX_RADIO_STRING],
    text_len: u8,
}

impl Default for Received {
    fn default() -> Self {
        Received {
            kind: MessageKind::None,
            integer: 0,
            text: [0; MAX_RADIO_STRING],
            text_len: 0,
        }
    }
}

impl Received {
    /// The string payload.
    pub fn text(&self) -> &[u8] {
        &self.text[..usize::from(self.text_len)]
    }
}

/// The radio driver.
#[derive(Debug)]
pub struct Radio<H> {
    hw: H,
    state: RadioState,
    config: RadioConfig,
    ring: PacketRing,
    received: Received,
}

impl<H: RadioHw> Radio<H> {
    /// Wrap a hardware instance; nothing is touched until first use.
    pub fn new(hw: H) -> Self {
        Radio {
            hw,
            state: RadioState::Uninitialized,
            config: RadioConfig::default(),
            ring: PacketRing::new(),
            received: Received::default(),
        }
    }

    /// Current driver state.
    pub fn state(&self) -> RadioState {
        self.state
    }

    /// The hardware, e.g. for its device id and clock.
    pub fn hw(&self) -> &H {
        &self.hw
    }

    /// Bring the hardware up on first use.
    pub fn ensure_initialized(&mut self) {
        if self.state != RadioState::Uninitialized {
            return;
        }
        self.hw.power_up();
        self.hw.apply(&self.config);
        self.hw.enable_rx();
        self.state = RadioState::Receiving;
    }

    /// Change the group prefix; applies in place.
    pub fn set_group(&mut self, group: u8) {
        self.ensure_initialized();
        self.config.group = group;
        self.hw.set_group(group);
    }

    /// Change transmit power, clamped to 0..=7; applies in place.
    pub fn set_power(&mut self, power: i32) {
        self.ensure_initialized();
        let power = power.clamp(0, 7) as u8;
        self.config.power = power;
        self.hw.set_power(power);
    }

    /// Retune to a channel, clamped to 0..=83. The receiver is disabled
    /// across the change and re-enabled afterwards.
    pub fn set_channel(&mut self, channel: i32) {
        self.ensure_initialized();
        let channel = channel.clamp(0, 83) as u8;
        self.config.channel = channel;
        if self.state == RadioState::Receiving {
            self.hw.disable();
            self.state = RadioState::Disabled;
        }
        self.hw.set_channel(channel);
        self.hw.enable_rx();
        self.state = RadioState::Receiving;
    }

    /// Synchronous raw send; reception resumes afterwards.
    pub fn send_packet(&mut self, packet: &[u8; PACKET_LEN]) {
        self.ensure_initialized();
        self.hw.disable();
        self.state = RadioState::Transmitting;
        self.hw.transmit(packet);
        self.hw.enable_rx();
        self.state = RadioState::Receiving;
    }

    /// The interrupt-side contract: drain latched END events into the ring.
    ///
    /// On a good CRC the signal strength is sampled (stored negated) and
    /// the packet queued; on a bad CRC the sample is zeroed and the packet
    /// dropped. Runs from the receive interrupt on hardware; embeddings
    /// that poll call it before every dequeue.
    pub fn service_events(&mut self) {
        loop {
            let events = self.hw.take_events();
            if !events.contains(RadioEvents::END) {
                return;
            }
            if events.contains(RadioEvents::CRC_ERROR) {
                self.ring.set_signal_strength(0);
                continue;
            }
            let mut packet = [0u8; PACKET_LEN];
            self.hw.read_packet(&mut packet);
            self.ring.set_signal_strength(-self.hw.rssi_sample());
            self.ring.push(&packet);
        }
    }

    /// Dequeue one raw packet, oldest first.
    pub fn receive_packet(&mut self, into: &mut [u8; PACKET_LEN]) -> bool {
        self.ensure_initialized();
        self.service_events();
        self.ring.pop(into)
    }

    /// Signal strength of the most recent reception, in negated dBm;
    /// always below zero once something was heard.
    pub fn signal_strength(&self) -> i32 {
        self.ring.signal_strength()
    }

    /// Fields of the last dequeued typed message.
    pub fn received(&self) -> &Received {
        &self.received
    }

    /// Dequeue packets until a MakeCode frame turns up, extract its fields
    /// into fixed storage and report whether one arrived. Packets that are
    /// not MakeCode frames are discarded in this mode.
    pub fn receive_message(&mut self) -> bool {
        let mut packet = [0u8; PACKET_LEN];
        while self.receive_packet(&mut packet) {
            let Some(payload) = frame::parse(&packet) else {
                continue;
            };
            self.received = Received::default();
            match payload {
                Payload::Integer(n) => {
                    self.received.kind = MessageKind::Integer;
                    self.received.integer = n;
                }
                Payload::Str(bytes) => {
                    self.received.kind = MessageKind::Str;
                    self.stash_text(bytes);
                }
                Payload::Pair(n, bytes) => {
                    self.received.kind = MessageKind::Pair;
                    self.received.integer = n;
                    self.stash_text(bytes);
                }
            }
            return true;
        }
        false
    }

    fn stash_text(&mut self, bytes: &[u8]) {
        let len = bytes.len().min(MAX_RADIO_STRING);
        self.received.text[..len].copy_from_slice(&bytes[..len]);
        self.received.text_len = len as u8;
    }

    /// Send a typed integer message.
    pub fn send_integer(&mut self, n: Word) {
        self.ensure_initialized();
        let mut packet = [0u8; PACKET_LEN];
        frame::encode_integer(
            &mut packet,
            n,
            self.config.group,
            self.hw.millis(),
            self.hw.device_id(),
        );
        self.send_packet(&packet);
    }

    /// Send a typed string message; the payload is capped at
    /// [`MAX_RADIO_STRING`] bytes.
    pub fn send_string(&mut self, text: &[u8]) {
        self.ensure_initialized();
        let mut packet = [0u8; PACKET_LEN];
        frame::encode_string(
            &mut packet,
            text,
            self.config.group,
            self.hw.millis(),
            self.hw.device_id(),
        );
        self.send_packet(&packet);
    }

    /// Send a typed name/value pair.
    pub fn send_pair(&mut self, name: &[u8], value: Word) {
        self.ensure_initialized();
        let mut packet = [0u8; PACKET_LEN];
        frame::encode_pair(
            &mut packet,
            name,
            value,
            self.config.group,
            self.hw.millis(),
            self.hw.device_id(),
        );
        self.send_packet(&packet);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame::FrameKind;

    #[test]
    fn state_machine_walks_through_channel_change() {
        let (a, _b) = LoopbackRadio::pair();
        let mut radio = Radio::new(a);
        assert_eq!(radio.state(), RadioState::Uninitialized);
        radio.set_channel(42);
        assert_eq!(radio.state(), RadioState::Receiving);
        assert_eq!(radio.config.channel, 42);
    }

    #[test]
    fn out_of_range_settings_are_clamped() {
        let (a, _b) = LoopbackRadio::pair();
        let mut radio = Radio::new(a);
        radio.set_channel(1000);
        assert_eq!(radio.config.channel, 83);
        radio.set_power(-5);
        assert_eq!(radio.config.power, 0);
    }

    #[test]
    fn non_makecode_packets_are_skipped_in_message_mode() {
        let (a, b) = LoopbackRadio::pair();
        let mut tx = Radio::new(a);
        let mut rx = Radio::new(b);
        tx.send_packet(&[0u8; PACKET_LEN]); // not a MakeCode frame
        tx.send_integer(9);
        assert!(rx.receive_message());
        assert_eq!(rx.received().kind, MessageKind::Integer);
        assert_eq!(rx.received().integer, 9);
        assert!(!rx.receive_message());
    }

    #[test]
    fn frame_kind_constant_matches_wire_type_byte() {
        assert_eq!(FrameKind::Integer as u8, 0);
        assert_eq!(FrameKind::Pair as u8, 1);
        assert_eq!(FrameKind::Str as u8, 2);
        assert_eq!(FrameKind::Double as u8, 4);
        assert_eq!(FrameKind::DoublePair as u8, 5);
    }
}
