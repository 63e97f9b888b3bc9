// Licensed under the Apache-2.0 license

//! Arbiter command words.
//!
//! Writing a command word to a channel's CMD0 register starts a transaction.
//! Layout, MSB first:
//!
//! ```text
//! | 31..27 | 26  | 25..20   | 19..12     | 11..4  | 3..0       |
//! | opcode | pri | slave id | periph id  | offset | byte count |
//! ```
//!
//! The byte count field holds the number of bytes transferred minus one.

use super::address::PmicAddress;

const OPCODE_SHIFT: u32 = 27;
const PRIORITY_SHIFT: u32 = 26;
const SLAVE_ID_SHIFT: u32 = 20;
const ADDR_SHIFT: u32 = 12;
const OFFSET_SHIFT: u32 = 4;

const OPCODE_MASK: u32 = 0x1F;
const SLAVE_ID_MASK: u32 = 0x3F;
const BYTE_COUNT_MASK: u8 = 0x0F;

/// SPMI command opcodes understood by the arbiter.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    ExtRegWriteLong = 0x00,
    ExtRegReadLong = 0x01,
    ExtRegReadLongDelayed = 0x02,
    TransferBusOwnership = 0x03,
    Reset = 0x04,
    Sleep = 0x05,
    Shutdown = 0x06,
    Wakeup = 0x07,
    ExtRegWrite = 0x08,
    ExtRegRead = 0x09,
    RegWrite = 0x0A,
    RegRead = 0x0B,
    Reg0Write = 0x0C,
    Auth = 0x0D,
    MasterWrite = 0x0E,
    MasterRead = 0x0F,
    DevDescBlkMasterRead = 0x10,
    DevDescBlkSlaveRead = 0x11,
}

impl Opcode {
    /// Decode the 5-bit opcode field.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        let op = match bits {
            0x00 => Opcode::ExtRegWriteLong,
            0x01 => Opcode::ExtRegReadLong,
            0x02 => Opcode::ExtRegReadLongDelayed,
            0x03 => Opcode::TransferBusOwnership,
            0x04 => Opcode::Reset,
            0x05 => Opcode::Sleep,
            0x06 => Opcode::Shutdown,
            0x07 => Opcode::Wakeup,
            0x08 => Opcode::ExtRegWrite,
            0x09 => Opcode::ExtRegRead,
            0x0A => Opcode::RegWrite,
            0x0B => Opcode::RegRead,
            0x0C => Opcode::Reg0Write,
            0x0D => Opcode::Auth,
            0x0E => Opcode::MasterWrite,
            0x0F => Opcode::MasterRead,
            0x10 => Opcode::DevDescBlkMasterRead,
            0x11 => Opcode::DevDescBlkSlaveRead,
            _ => return None,
        };
        Some(op)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// Arbitration priority of a command.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Priority {
    #[default]
    Low,
    High,
}

/// Which addressing fields go into the command word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Addressing {
    /// Slave id and peripheral address are encoded in the word.
    Explicit,
    /// The channel already routes to the peripheral; both fields are zero.
    ChannelImplied,
}

/// A single arbiter command, built fresh for every transaction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub opcode: Opcode,
    pub priority: Priority,
    pub slave_id: u8,
    pub address: u8,
    pub offset: u8,
    /// Bytes transferred minus one.
    pub byte_count: u8,
}

impl Command {
    /// Build a command moving `size` bytes (1..=16) starting at `target`.
    #[must_use]
    pub const fn new(opcode: Opcode, target: PmicAddress, size: u8) -> Self {
        Self {
            opcode,
            priority: Priority::Low,
            slave_id: target.slave_id,
            address: target.peripheral_id,
            offset: target.offset,
            byte_count: size.saturating_sub(1) & BYTE_COUNT_MASK,
        }
    }

    /// Extended long register write of `size` bytes.
    #[must_use]
    pub const fn write(target: PmicAddress, size: u8) -> Self {
        Self::new(Opcode::ExtRegWriteLong, target, size)
    }

    /// Extended long register read of `size` bytes.
    #[must_use]
    pub const fn read(target: PmicAddress, size: u8) -> Self {
        Self::new(Opcode::ExtRegReadLong, target, size)
    }

    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Number of bytes this command transfers.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.byte_count as usize + 1
    }

    /// The register address the command targets.
    #[must_use]
    pub const fn target(&self) -> PmicAddress {
        PmicAddress::new(self.slave_id, self.address, self.offset)
    }

    /// Pack the command into the CMD0 register value.
    #[must_use]
    pub const fn word(&self, addressing: Addressing) -> u32 {
        let mut word = ((self.opcode as u32) & OPCODE_MASK) << OPCODE_SHIFT;
        if matches!(self.priority, Priority::High) {
            word |= 1 << PRIORITY_SHIFT;
        }
        if matches!(addressing, Addressing::Explicit) {
            word |= ((self.slave_id as u32) & SLAVE_ID_MASK) << SLAVE_ID_SHIFT;
            word |= (self.address as u32) << ADDR_SHIFT;
        }
        word |= (self.offset as u32) << OFFSET_SHIFT;
        word | (self.byte_count & BYTE_COUNT_MASK) as u32
    }

    /// Unpack a CMD0 register value. Returns `None` for unknown opcodes.
    #[must_use]
    pub const fn from_word(word: u32) -> Option<Self> {
        let opcode = match Opcode::from_bits(((word >> OPCODE_SHIFT) & OPCODE_MASK) as u8) {
            Some(op) => op,
            None => return None,
        };
        let priority = if word & (1 << PRIORITY_SHIFT) != 0 {
            Priority::High
        } else {
            Priority::Low
        };
        Some(Self {
            opcode,
            priority,
            slave_id: ((word >> SLAVE_ID_SHIFT) & SLAVE_ID_MASK) as u8,
            address: (word >> ADDR_SHIFT) as u8,
            offset: (word >> OFFSET_SHIFT) as u8,
            byte_count: (word as u8) & BYTE_COUNT_MASK,
        })
    }
}
