// Licensed under the Apache-2.0 license

//! Polled SPMI transactions through the PMIC arbiter.
//!
//! A [`BusSession`] owns the register backend, the delay provider used to
//! pace status polling and the channel table discovered at init. Every
//! transaction runs to completion before the call returns:
//!
//! 1. resolve the channel serving the target (slave, peripheral) pair;
//! 2. clear the channel CONFIG register so completion is not routed to an
//!    interrupt;
//! 3. writes only: load WDATA0/WDATA1 with the payload, little-endian;
//! 4. write the command word to CMD0, which starts the transfer;
//! 5. poll STATUS until it turns non-zero or the poll budget runs out;
//! 6. reads only: drain RDATA0..RDATA2 into the caller's buffer.
//!
//! Writes go through the core half of the channel, reads through the
//! observer half. A write that fails midway is not rolled back.
//!
//! # Examples
//!
//! ```rust,no_run
//! use spmi_arb::spmi::{BusSession, Mmio, SpmiConfig};
//! # struct Spin;
//! # impl embedded_hal::delay::DelayNs for Spin { fn delay_ns(&mut self, _ns: u32) {} }
//!
//! // SAFETY: the APQ8016 arbiter is mapped 1:1 and owned by this session.
//! let regs = unsafe { Mmio::new() };
//! let mut bus = BusSession::init(regs, Spin, SpmiConfig::default()).unwrap();
//!
//! // Drive PM8916 GPIO1 high.
//! bus.write_byte(0xC040, 0x11).unwrap();
//! let status = bus.read_byte(0xC008).unwrap();
//! ```

use embedded_hal::delay::DelayNs;

use super::address::PmicAddress;
use super::channel::{Channel, ChannelTable};
use super::command::{Command, Opcode};
use super::config::SpmiConfig;
use super::error::SpmiError;
use super::poll::{poll_bounded, PollError};
use super::registers::{
    ChannelReg, Half, RegisterAccess, DATA_REG_BYTES, MAX_READ_BYTES, MAX_WRITE_BYTES,
    STATUS_DONE,
};
use super::traits::PmicBus;
use crate::common::{Logger, NoOpLogger};

/// An initialized arbiter, ready for transactions.
pub struct BusSession<R: RegisterAccess, D: DelayNs, L: Logger = NoOpLogger> {
    regs: R,
    delay: D,
    logger: L,
    config: SpmiConfig,
    channels: ChannelTable,
}

impl<R: RegisterAccess, D: DelayNs> BusSession<R, D, NoOpLogger> {
    /// Scan the channel descriptors and open a session.
    ///
    /// # Errors
    ///
    /// Returns [`SpmiError::ChannelTableFull`] if the scan cannot be recorded.
    pub fn init(regs: R, delay: D, config: SpmiConfig) -> Result<Self, SpmiError> {
        Self::init_with_logger(regs, delay, config, NoOpLogger)
    }
}

impl<R: RegisterAccess, D: DelayNs, L: Logger> BusSession<R, D, L> {
    /// Like [`BusSession::init`], reporting diagnostics through `logger`.
    ///
    /// # Errors
    ///
    /// Returns [`SpmiError::ChannelTableFull`] if the scan cannot be recorded.
    pub fn init_with_logger(
        mut regs: R,
        delay: D,
        config: SpmiConfig,
        mut logger: L,
    ) -> Result<Self, SpmiError> {
        let channels = ChannelTable::scan(&mut regs, &config.layout)?;
        logger.debug(format_args!(
            "spmi: {:?} arbiter, {} peripheral(s) mapped",
            config.generation,
            channels.len()
        ));
        Ok(Self {
            regs,
            delay,
            logger,
            config,
            channels,
        })
    }

    #[must_use]
    pub fn config(&self) -> &SpmiConfig {
        &self.config
    }

    #[must_use]
    pub fn channels(&self) -> &ChannelTable {
        &self.channels
    }

    /// Close the session and hand back the register backend and delay.
    pub fn release(self) -> (R, D) {
        (self.regs, self.delay)
    }

    /// Read one register.
    ///
    /// # Errors
    ///
    /// See [`BusSession::read_bytes`].
    pub fn read_byte(&mut self, addr: u32) -> Result<u8, SpmiError> {
        let mut value = [0u8; 1];
        self.read_cmd(target(addr)?, &mut value)?;
        let [byte] = value;
        Ok(byte)
    }

    /// Write one register.
    ///
    /// # Errors
    ///
    /// See [`BusSession::write_bytes`].
    pub fn write_byte(&mut self, addr: u32, value: u8) -> Result<(), SpmiError> {
        self.write_cmd(target(addr)?, &[value])
    }

    /// Read `buf.len()` consecutive registers starting at `addr`.
    ///
    /// # Errors
    ///
    /// * [`SpmiError::InvalidTransferSize`] for an empty buffer or one longer
    ///   than [`MAX_READ_BYTES`].
    /// * [`SpmiError::AddressOutOfRange`] if `addr` is above
    ///   [`MAX_ADDRESS`](super::address::MAX_ADDRESS).
    /// * [`SpmiError::UnknownPeripheral`] if no channel serves the address.
    /// * [`SpmiError::BusTransactionFailed`] or [`SpmiError::Timeout`] from
    ///   the transaction itself.
    pub fn read_bytes(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), SpmiError> {
        self.read_cmd(target(addr)?, buf)
    }

    /// Write `data` to consecutive registers starting at `addr`.
    ///
    /// # Errors
    ///
    /// * [`SpmiError::InvalidTransferSize`] for empty data or more than
    ///   [`MAX_WRITE_BYTES`].
    /// * [`SpmiError::AddressOutOfRange`] if `addr` is above
    ///   [`MAX_ADDRESS`](super::address::MAX_ADDRESS).
    /// * [`SpmiError::UnknownPeripheral`] if no channel serves the address.
    /// * [`SpmiError::BusTransactionFailed`] or [`SpmiError::Timeout`] from
    ///   the transaction itself.
    pub fn write_bytes(&mut self, addr: u32, data: &[u8]) -> Result<(), SpmiError> {
        self.write_cmd(target(addr)?, data)
    }

    /// Issue an extended long register write through the core half.
    ///
    /// # Errors
    ///
    /// See [`BusSession::write_bytes`].
    pub fn write_cmd(&mut self, target: PmicAddress, data: &[u8]) -> Result<(), SpmiError> {
        let size = check_size(data.len(), MAX_WRITE_BYTES)?;
        let channel = self
            .channels
            .resolve(target.slave_id, target.peripheral_id)?;
        let layout = self.config.layout;

        self.regs
            .write32(layout.channel_reg(Half::Core, channel, ChannelReg::Config), 0);

        for (n, chunk) in (0u8..).zip(data.chunks(DATA_REG_BYTES)) {
            let mut word = [0u8; DATA_REG_BYTES];
            for (dst, src) in word.iter_mut().zip(chunk) {
                *dst = *src;
            }
            self.regs.write32(
                layout.channel_reg(Half::Core, channel, ChannelReg::Wdata(n)),
                u32::from_le_bytes(word),
            );
        }

        let cmd = Command::write(target, size).with_priority(self.config.priority);
        self.regs.write32(
            layout.channel_reg(Half::Core, channel, ChannelReg::Cmd0),
            cmd.word(self.config.generation.write_addressing()),
        );

        self.await_done(Half::Core, channel, cmd.opcode)
    }

    /// Issue an extended long register read through the observer half.
    ///
    /// # Errors
    ///
    /// See [`BusSession::read_bytes`].
    pub fn read_cmd(&mut self, target: PmicAddress, buf: &mut [u8]) -> Result<(), SpmiError> {
        let size = check_size(buf.len(), MAX_READ_BYTES)?;
        let channel = self
            .channels
            .resolve(target.slave_id, target.peripheral_id)?;
        let layout = self.config.layout;

        self.regs.write32(
            layout.channel_reg(Half::Observer, channel, ChannelReg::Config),
            0,
        );

        let cmd = Command::read(target, size).with_priority(self.config.priority);
        self.regs.write32(
            layout.channel_reg(Half::Observer, channel, ChannelReg::Cmd0),
            cmd.word(self.config.generation.read_addressing()),
        );

        self.await_done(Half::Observer, channel, cmd.opcode)?;

        for (n, chunk) in (0u8..).zip(buf.chunks_mut(DATA_REG_BYTES)) {
            let word = self
                .regs
                .read32(layout.channel_reg(Half::Observer, channel, ChannelReg::Rdata(n)));
            for (dst, src) in chunk.iter_mut().zip(word.to_le_bytes()) {
                *dst = src;
            }
        }
        Ok(())
    }

    fn await_done(&mut self, half: Half, channel: Channel, opcode: Opcode) -> Result<(), SpmiError> {
        let status_reg = self
            .config
            .layout
            .channel_reg(half, channel, ChannelReg::Status);
        let regs = &mut self.regs;

        let outcome = poll_bounded(&self.config.poll, &mut self.delay, || {
            match regs.read32(status_reg) {
                0 => Err(nb::Error::WouldBlock),
                STATUS_DONE => Ok(()),
                status => Err(nb::Error::Other(status)),
            }
        });

        match outcome {
            Ok(()) => Ok(()),
            Err(PollError::Failed(status)) => {
                self.logger.error(format_args!(
                    "spmi: {opcode:?} on channel {channel} failed, status {status:#x}"
                ));
                Err(SpmiError::BusTransactionFailed { opcode, status })
            }
            Err(PollError::Expired) => {
                self.logger.warn(format_args!(
                    "spmi: {opcode:?} on channel {channel} timed out after {} us",
                    self.config.poll.timeout.ticks()
                ));
                Err(SpmiError::Timeout { opcode, channel })
            }
        }
    }
}

impl<R: RegisterAccess, D: DelayNs, L: Logger> PmicBus for BusSession<R, D, L> {
    type Error = SpmiError;

    fn read_byte(&mut self, addr: u32) -> Result<u8, SpmiError> {
        BusSession::read_byte(self, addr)
    }

    fn write_byte(&mut self, addr: u32, value: u8) -> Result<(), SpmiError> {
        BusSession::write_byte(self, addr, value)
    }
}

/// Decode a caller-supplied flat address without wrapping high bits.
fn target(addr: u32) -> Result<PmicAddress, SpmiError> {
    PmicAddress::checked_decode(addr).ok_or(SpmiError::AddressOutOfRange { addr })
}

/// Validate a transfer length against a data register capacity.
fn check_size(size: usize, max: usize) -> Result<u8, SpmiError> {
    if size == 0 || size > max {
        return Err(SpmiError::InvalidTransferSize { size, max });
    }
    u8::try_from(size).map_err(|_| SpmiError::InvalidTransferSize { size, max })
}
