use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use crate::consts::PACKET_LEN;

use super::{RadioConfig, RadioEvents, RadioHw};

#[derive(Debug, Default)]
struct Inbox {
    packets: VecDeque<[u8; PACKET_LEN]>,
}

/// Software radio pair for tests and host simulations.
///
/// Two endpoints share a pair of in-memory inboxes; a transmit on one side
/// lands in the other side's inbox when both sit on the same group and
/// channel. Reception strength is a fixed plausible sample.
#[derive(Debug)]
pub struct LoopbackRadio {
    inbox: Arc<Mutex<Inbox>>,
    peer: Arc<Mutex<Inbox>>,
    peer_config: Arc<Mutex<RadioConfig>>,
    config: Arc<Mutex<RadioConfig>>,
    pending: Option<[u8; PACKET_LEN]>,
    device_id: u32,
    /// Fixed timestamp source; loopback tests don't need a real clock.
    clock: u32,
}

impl LoopbackRadio {
    /// A connected pair of endpoints.
    pub fn pair() -> (Self, Self) {
        let a_inbox = Arc::new(Mutex::new(Inbox::default()));
        let b_inbox = Arc::new(Mutex::new(Inbox::default()));
        let a_config = Arc::new(Mutex::new(RadioConfig::default()));
        let b_config = Arc::new(Mutex::new(RadioConfig::default()));
        let a = LoopbackRadio {
            inbox: Arc::clone(&a_inbox),
            peer: Arc::clone(&b_inbox),
            config: Arc::clone(&a_config),
            peer_config: Arc::clone(&b_config),
            pending: None,
            device_id: 1,
            clock: 0,
        };
        let b = LoopbackRadio {
            inbox: b_inbox,
            peer: a_inbox,
            config: b_config,
            peer_config: a_config,
            pending: None,
            device_id: 2,
            clock: 0,
        };
        (a, b)
    }

    fn tuned_together(&self) -> bool {
        let mine = *self.config.lock().expect("loopback config lock");
        let theirs = *self.peer_config.lock().expect("loopback config lock");
        mine.group == theirs.group && mine.channel == theirs.channel
    }
}

impl RadioHw for LoopbackRadio {
    fn power_up(&mut self) {}

    fn apply(&mut self, config: &RadioConfig) {
        *self.config.lock().expect("loopback config lock") = *config;
    }

    fn set_channel(&mut self, channel: u8) {
        self.config.lock().expect("loopback config lock").channel = channel;
    }

    fn set_power(&mut self, power: u8) {
        self.config.lock().expect("loopback config lock").power = power;
    }

    fn set_group(&mut self, group: u8) {
        self.config.lock().expect("loopback config lock").group = group;
    }

    fn enable_rx(&mut self) {}

    fn disable(&mut self) {}

    fn transmit(&mut self, packet: &[u8; PACKET_LEN]) {
        if self.tuned_together() {
            self.peer
                .lock()
                .expect("loopback inbox lock")
                .packets
                .push_back(*packet);
        }
    }

    fn take_events(&mut self) -> RadioEvents {
        if self.pending.is_none() {
            self.pending = self.inbox.lock().expect("loopback inbox lock").packets.pop_front();
        }
        if self.pending.is_some() {
            RadioEvents::END
        } else {
            RadioEvents::empty()
        }
    }

    fn read_packet(&mut self, into: &mut [u8; PACKET_LEN]) {
        if let Some(packet) = self.pending.take() {
            *into = packet;
        }
    }

    fn rssi_sample(&self) -> i32 {
        42
    }

    fn device_id(&self) -> u32 {
        self.device_id
    }

    fn millis(&self) -> u32 {
        self.clock
    }
}
