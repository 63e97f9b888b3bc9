// Licensed under the Apache-2.0 license

//! Channel discovery.
//!
//! The arbiter multiplexes its command/status/data register windows over a
//! fixed set of channels. Firmware does not choose the channel for a
//! peripheral: at boot it reads the arbiter's descriptor bank, where entry
//! `i` names the (slave, peripheral) pair wired to channel `i`, and keeps the
//! inverse mapping for the rest of the session.

use heapless::FnvIndexMap;

use super::error::SpmiError;
use super::registers::{ArbiterLayout, RegisterAccess, MAX_PERIPH};

/// Index of a hardware channel, `0..MAX_PERIPH`.
pub type Channel = u8;

const DESC_SLAVE_ID_MASK: u32 = 0x000F_0000;
const DESC_SLAVE_ID_SHIFT: u32 = 16;
const DESC_PERIPH_ID_MASK: u32 = 0x0000_FF00;
const DESC_PERIPH_ID_SHIFT: u32 = 8;

/// Extract `(slave_id, peripheral_id)` from a channel descriptor register.
#[must_use]
pub const fn decode_descriptor(descriptor: u32) -> (u8, u8) {
    (
        ((descriptor & DESC_SLAVE_ID_MASK) >> DESC_SLAVE_ID_SHIFT) as u8,
        ((descriptor & DESC_PERIPH_ID_MASK) >> DESC_PERIPH_ID_SHIFT) as u8,
    )
}

/// Build the descriptor register value reporting `(slave_id, peripheral_id)`.
#[must_use]
pub const fn encode_descriptor(slave_id: u8, peripheral_id: u8) -> u32 {
    (((slave_id as u32) << DESC_SLAVE_ID_SHIFT) & DESC_SLAVE_ID_MASK)
        | ((peripheral_id as u32) << DESC_PERIPH_ID_SHIFT)
}

const fn key(slave_id: u8, peripheral_id: u8) -> u16 {
    ((slave_id as u16) << 8) | peripheral_id as u16
}

/// Mapping from (slave, peripheral) to the channel serving it.
#[derive(Clone, Debug, Default)]
pub struct ChannelTable {
    map: FnvIndexMap<u16, Channel, MAX_PERIPH>,
}

impl ChannelTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: FnvIndexMap::new(),
        }
    }

    /// Read all `MAX_PERIPH` descriptor registers and build the table.
    ///
    /// Unwired channels report an all-zero descriptor and are left out.
    /// When several descriptors name the same pair, the highest channel
    /// index wins.
    ///
    /// # Errors
    ///
    /// Returns [`SpmiError::ChannelTableFull`] if a pair cannot be recorded.
    pub fn scan<R: RegisterAccess>(
        regs: &mut R,
        layout: &ArbiterLayout,
    ) -> Result<Self, SpmiError> {
        let mut table = Self::new();
        for channel in 0..MAX_PERIPH {
            let descriptor = regs.read32(layout.descriptor(channel));
            if descriptor == 0 {
                continue;
            }
            let (slave_id, peripheral_id) = decode_descriptor(descriptor);
            // MAX_PERIPH fits in a Channel
            table.record(slave_id, peripheral_id, channel as Channel)?;
        }
        Ok(table)
    }

    /// Map `(slave_id, peripheral_id)` to `channel`, replacing any earlier entry.
    ///
    /// # Errors
    ///
    /// Returns [`SpmiError::ChannelTableFull`] when the pair is new and the
    /// table already holds `MAX_PERIPH` pairs.
    pub fn record(
        &mut self,
        slave_id: u8,
        peripheral_id: u8,
        channel: Channel,
    ) -> Result<(), SpmiError> {
        self.map
            .insert(key(slave_id, peripheral_id), channel)
            .map(|_| ())
            .map_err(|_| SpmiError::ChannelTableFull)
    }

    /// Channel serving `(slave_id, peripheral_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`SpmiError::UnknownPeripheral`] if no descriptor named the pair.
    pub fn resolve(&self, slave_id: u8, peripheral_id: u8) -> Result<Channel, SpmiError> {
        self.map
            .get(&key(slave_id, peripheral_id))
            .copied()
            .ok_or(SpmiError::UnknownPeripheral {
                slave_id,
                peripheral_id,
            })
    }

    /// Number of distinct pairs in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate `(slave_id, peripheral_id, channel)` entries in scan order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u8, Channel)> + '_ {
        self.map
            .iter()
            .map(|(&k, &channel)| ((k >> 8) as u8, k as u8, channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Descriptor bank backed by a map; unpopulated descriptors read as zero.
    struct MockDescriptors {
        layout: ArbiterLayout,
        regs: HashMap<usize, u32>,
        reads: usize,
    }

    impl MockDescriptors {
        fn new() -> Self {
            Self {
                layout: ArbiterLayout::APQ8016,
                regs: HashMap::new(),
                reads: 0,
            }
        }

        fn set(&mut self, channel: usize, slave_id: u8, peripheral_id: u8) {
            self.regs.insert(
                self.layout.descriptor(channel),
                encode_descriptor(slave_id, peripheral_id),
            );
        }
    }

    impl RegisterAccess for MockDescriptors {
        fn read32(&mut self, addr: usize) -> u32 {
            self.reads += 1;
            self.regs.get(&addr).copied().unwrap_or(0)
        }

        fn write32(&mut self, _addr: usize, _value: u32) {
            panic!("channel scan must not write registers");
        }
    }

    fn pm8916_bank() -> MockDescriptors {
        let mut bank = MockDescriptors::new();
        // PON, then the four GPIO peripherals, all on slave 0
        bank.set(1, 0, 0x08);
        for (i, pid) in (0xC0..=0xC3).enumerate() {
            bank.set(2 + i, 0, pid);
        }
        bank.set(6, 1, 0x40);
        bank
    }

    #[test]
    fn test_decode_descriptor_fields() {
        assert_eq!(decode_descriptor(0x0001_C100), (1, 0xC1));
        // bits outside the slave and peripheral fields are ignored
        assert_eq!(decode_descriptor(0xFFF0_C1FF), (0, 0xC1));
        assert_eq!(decode_descriptor(encode_descriptor(0xF, 0x08)), (0xF, 0x08));
    }

    #[test]
    fn test_scan_records_descriptor_five() {
        let mut bank = MockDescriptors::new();
        bank.set(5, 0, 0xC1);
        let layout = bank.layout;

        let table = ChannelTable::scan(&mut bank, &layout).unwrap();

        assert_eq!(table.resolve(0, 0xC1), Ok(5));
        assert_eq!(bank.reads, MAX_PERIPH);
    }

    #[test]
    fn test_resolve_every_scanned_pair() {
        let mut bank = pm8916_bank();
        let layout = bank.layout;
        let table = ChannelTable::scan(&mut bank, &layout).unwrap();

        assert_eq!(table.resolve(0, 0x08), Ok(1));
        assert_eq!(table.resolve(0, 0xC0), Ok(2));
        assert_eq!(table.resolve(0, 0xC3), Ok(5));
        assert_eq!(table.resolve(1, 0x40), Ok(6));
        // idempotent
        for _ in 0..3 {
            assert_eq!(table.resolve(0, 0xC2), Ok(4));
        }
    }

    #[test]
    fn test_resolve_unknown_pair() {
        let mut bank = pm8916_bank();
        let layout = bank.layout;
        let table = ChannelTable::scan(&mut bank, &layout).unwrap();

        assert_eq!(
            table.resolve(0, 0xC7),
            Err(SpmiError::UnknownPeripheral {
                slave_id: 0,
                peripheral_id: 0xC7
            })
        );
        // slave ids beyond the 4-bit descriptor field can never match
        assert!(table.resolve(0x10, 0x08).is_err());
    }

    #[test]
    fn test_duplicate_descriptor_last_wins() {
        let mut bank = MockDescriptors::new();
        bank.set(10, 2, 0x50);
        bank.set(20, 2, 0x50);
        let layout = bank.layout;

        let table = ChannelTable::scan(&mut bank, &layout).unwrap();

        assert_eq!(table.resolve(2, 0x50), Ok(20));
    }

    #[test]
    fn test_unwired_descriptors_are_skipped() {
        let mut bank = pm8916_bank();
        let layout = bank.layout;
        let table = ChannelTable::scan(&mut bank, &layout).unwrap();

        assert_eq!(
            table.resolve(0, 0x00),
            Err(SpmiError::UnknownPeripheral {
                slave_id: 0,
                peripheral_id: 0x00
            })
        );
        assert_eq!(table.len(), 6);
        assert!(table.iter().any(|entry| entry == (1, 0x40, 6)));
        assert_eq!(bank.reads, MAX_PERIPH);
    }

    #[test]
    fn test_descriptor_with_only_stray_bits_is_recorded() {
        // non-zero outside the id fields: wired, and decodes to (0, 0x00)
        let mut bank = MockDescriptors::new();
        let addr = bank.layout.descriptor(9);
        bank.regs.insert(addr, 0x0000_0001);
        let layout = bank.layout;

        let table = ChannelTable::scan(&mut bank, &layout).unwrap();
        assert_eq!(table.resolve(0, 0x00), Ok(9));
    }

    #[test]
    fn test_table_full_is_reported() {
        let mut table = ChannelTable::new();
        for i in 0..MAX_PERIPH {
            table.record(0, i as u8, i as Channel).unwrap();
        }
        assert_eq!(table.record(1, 0, 0), Err(SpmiError::ChannelTableFull));
        assert_eq!(table.len(), MAX_PERIPH);
        assert_eq!(table.resolve(0, 127), Ok(127));
    }
}
