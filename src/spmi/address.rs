// Licensed under the Apache-2.0 license

//! Flat PMIC register addresses.
//!
//! Consumer drivers address PMIC registers with a single 32-bit value:
//!
//! ```text
//!  31        16 15        8 7          0
//! +------------+-----------+------------+
//! |  slave id  | periph id |   offset   |
//! +------------+-----------+------------+
//! ```
//!
//! The slave id is nominally 4 bits wide on the bus; it is decoded into a
//! full byte, so any address up to [`MAX_ADDRESS`] survives a decode/encode
//! round trip unchanged. Addresses above that name a slave id no descriptor
//! can report and are refused by [`PmicAddress::checked_decode`].

/// Highest flat address whose fields fit [`PmicAddress`].
pub const MAX_ADDRESS: u32 = 0x00FF_FFFF;

const SLAVE_ID_SHIFT: u32 = 16;
const PERIPH_ID_SHIFT: u32 = 8;

/// A decoded PMIC register address.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PmicAddress {
    pub slave_id: u8,
    pub peripheral_id: u8,
    pub offset: u8,
}

impl PmicAddress {
    #[must_use]
    pub const fn new(slave_id: u8, peripheral_id: u8, offset: u8) -> Self {
        Self {
            slave_id,
            peripheral_id,
            offset,
        }
    }

    /// Split a flat address into its bus fields, or `None` if it is above
    /// [`MAX_ADDRESS`].
    #[must_use]
    pub const fn checked_decode(addr: u32) -> Option<Self> {
        if addr > MAX_ADDRESS {
            return None;
        }
        Some(Self::decode(addr))
    }

    /// Split a flat address into its bus fields. Bits above 23 are dropped;
    /// use [`PmicAddress::checked_decode`] for caller-supplied addresses.
    #[must_use]
    pub const fn decode(addr: u32) -> Self {
        Self {
            slave_id: (addr >> SLAVE_ID_SHIFT) as u8,
            peripheral_id: (addr >> PERIPH_ID_SHIFT) as u8,
            offset: addr as u8,
        }
    }

    /// Pack the bus fields back into a flat address.
    #[must_use]
    pub const fn encode(self) -> u32 {
        ((self.slave_id as u32) << SLAVE_ID_SHIFT)
            | ((self.peripheral_id as u32) << PERIPH_ID_SHIFT)
            | self.offset as u32
    }

    /// Same peripheral, different register.
    #[must_use]
    pub const fn with_offset(self, offset: u8) -> Self {
        Self { offset, ..self }
    }
}

impl From<u32> for PmicAddress {
    fn from(addr: u32) -> Self {
        Self::decode(addr)
    }
}

impl From<PmicAddress> for u32 {
    fn from(addr: PmicAddress) -> Self {
        addr.encode()
    }
}
