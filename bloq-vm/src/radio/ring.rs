use core::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

use crate::consts::{MAX_PACKETS, PACKET_LEN};

/// Fixed ring of packet slots shared between the receive interrupt and the
/// VM.
///
/// The interrupt side writes slots and bumps the occupancy count; the VM
/// side reads slots and decrements it. The count and the signal-strength
/// sample are the only words both contexts touch, and both are single-word
/// atomics, so neither side ever observes a torn multi-word update. Each
/// index is advanced only by its own side.
///
/// Overflow policy: when the ring is full the newest arrival is dropped
/// (the count saturates at [`MAX_PACKETS`]) until the consumer drains.
#[derive(Debug)]
pub struct PacketRing {
    slots: [[u8; PACKET_LEN]; MAX_PACKETS],
    write_index: usize,
    read_index: usize,
    count: AtomicUsize,
    signal_strength: AtomicI32,
}

impl Default for PacketRing {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketRing {
    /// An empty ring.
    pub fn new() -> Self {
        PacketRing {
            slots: [[0; PACKET_LEN]; MAX_PACKETS],
            write_index: 0,
            read_index: 0,
            count: AtomicUsize::new(0),
            signal_strength: AtomicI32::new(0),
        }
    }

    /// Packets waiting to be consumed.
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Producer side: queue a packet, or drop it when the ring is full.
    pub fn push(&mut self, packet: &[u8; PACKET_LEN]) -> bool {
        if self.count.load(Ordering::Acquire) >= MAX_PACKETS {
            return false;
        }
        self.slots[self.write_index] = *packet;
        self.write_index = (self.write_index + 1) & (MAX_PACKETS - 1);
        self.count.fetch_add(1, Ordering::Release);
        true
    }

    /// Consumer side: dequeue the oldest packet into `into`.
    pub fn pop(&mut self, into: &mut [u8; PACKET_LEN]) -> bool {
        if self.count.load(Ordering::Acquire) == 0 {
            return false;
        }
        *into = self.slots[self.read_index];
        self.read_index = (self.read_index + 1) & (MAX_PACKETS - 1);
        self.count.fetch_sub(1, Ordering::Release);
        true
    }

    /// Store the (already negated) strength sample of the last reception.
    pub fn set_signal_strength(&self, dbm: i32) {
        self.signal_strength.store(dbm, Ordering::Release);
    }

    /// Strength sample of the last reception; zero after a CRC failure.
    pub fn signal_strength(&self) -> i32 {
        self.signal_strength.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(tag: u8) -> [u8; PACKET_LEN] {
        let mut p = [0u8; PACKET_LEN];
        p[0] = tag;
        p
    }

    #[test]
    fn fifo_order_is_preserved() {
        let mut ring = PacketRing::new();
        for i in 0..5 {
            assert!(ring.push(&packet(i)));
        }
        let mut out = [0u8; PACKET_LEN];
        for i in 0..5 {
            assert!(ring.pop(&mut out));
            assert_eq!(out[0], i);
        }
        assert!(!ring.pop(&mut out));
    }

    #[test]
    fn overflow_drops_the_newest_until_drained() {
        let mut ring = PacketRing::new();
        for i in 0..MAX_PACKETS {
            assert!(ring.push(&packet(i as u8)));
        }
        assert!(!ring.push(&packet(0xEE)));
        assert_eq!(ring.len(), MAX_PACKETS);

        let mut out = [0u8; PACKET_LEN];
        assert!(ring.pop(&mut out));
        assert_eq!(out[0], 0); // oldest survived the overflow
        assert!(ring.push(&packet(0xAB))); // room again after one drain
    }

    #[test]
    fn indexes_wrap_around_the_mask() {
        let mut ring = PacketRing::new();
        let mut out = [0u8; PACKET_LEN];
        for round in 0..3 * MAX_PACKETS as u8 {
            assert!(ring.push(&packet(round)));
            assert!(ring.pop(&mut out));
            assert_eq!(out[0], round);
        }
    }
}
