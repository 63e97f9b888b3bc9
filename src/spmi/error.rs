// Licensed under the Apache-2.0 license

//! Error types for the SPMI arbiter.

use core::fmt;

use super::command::Opcode;

/// Errors reported by bus operations.
///
/// Nothing here is retried by the arbiter; whether a failed access is fatal
/// or maps to a fallback value is up to the consumer driver.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpmiError {
    /// The (slave, peripheral) pair was not reported by any channel
    /// descriptor during the scan.
    UnknownPeripheral { slave_id: u8, peripheral_id: u8 },
    /// The flat address has bits set above the slave id field.
    AddressOutOfRange { addr: u32 },
    /// The arbiter finished the command with a status other than "done".
    /// `status` is the raw STATUS register value.
    BusTransactionFailed { opcode: Opcode, status: u32 },
    /// STATUS stayed zero for the whole poll budget.
    Timeout { opcode: Opcode, channel: u8 },
    /// Transfer buffer empty or larger than the channel data registers.
    InvalidTransferSize { size: usize, max: usize },
    /// The channel scan could not record a descriptor.
    ChannelTableFull,
}

/// Coarse classification of [`SpmiError`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller addressed something that is not on the bus.
    Addressing,
    /// Hardware reported a failure.
    Bus,
    /// Hardware never answered.
    Timeout,
    /// Caller passed arguments the arbiter cannot express.
    Usage,
}

impl SpmiError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SpmiError::UnknownPeripheral { .. } | SpmiError::AddressOutOfRange { .. } => {
                ErrorKind::Addressing
            }
            SpmiError::BusTransactionFailed { .. } => ErrorKind::Bus,
            SpmiError::Timeout { .. } => ErrorKind::Timeout,
            SpmiError::InvalidTransferSize { .. } | SpmiError::ChannelTableFull => {
                ErrorKind::Usage
            }
        }
    }
}

impl fmt::Display for SpmiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpmiError::UnknownPeripheral {
                slave_id,
                peripheral_id,
            } => write!(
                f,
                "no channel for slave {slave_id:#x} peripheral {peripheral_id:#04x}"
            ),
            SpmiError::AddressOutOfRange { addr } => {
                write!(f, "address {addr:#010x} outside the PMIC address space")
            }
            SpmiError::BusTransactionFailed { opcode, status } => {
                write!(f, "{opcode:?} failed with status {status:#x}")
            }
            SpmiError::Timeout { opcode, channel } => {
                write!(f, "{opcode:?} timed out on channel {channel}")
            }
            SpmiError::InvalidTransferSize { size, max } => {
                write!(f, "transfer of {size} bytes outside 1..={max}")
            }
            SpmiError::ChannelTableFull => f.write_str("channel table full"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SpmiError {}
