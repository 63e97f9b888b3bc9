// Licensed under the Apache-2.0 license

//! Bus interface seen by PMIC consumer drivers.
//!
//! GPIO, power-key and regulator drivers only ever need byte access to a
//! flat PMIC register address (see [`PmicAddress`](super::address::PmicAddress)
//! for the layout). They are written against this trait so they run on top of
//! [`BusSession`](super::arbiter::BusSession) on hardware and on any mock in
//! tests.
//!
//! ```rust,no_run
//! use spmi_arb::spmi::PmicBus;
//!
//! const PON_INT_RT_STS: u32 = 0x0810;
//! const KPDPWR_ON: u8 = 1 << 0;
//!
//! /// Boot must go on without the key: a failed read counts as "not pressed".
//! fn power_key_pressed<B: PmicBus>(bus: &mut B) -> bool {
//!     bus.read_byte(PON_INT_RT_STS)
//!         .is_ok_and(|sts| sts & KPDPWR_ON != 0)
//! }
//! ```

/// Byte-wide PMIC register access.
pub trait PmicBus {
    type Error: core::fmt::Debug;

    /// Read the register at `addr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not reachable or the bus
    /// transaction fails.
    fn read_byte(&mut self, addr: u32) -> Result<u8, Self::Error>;

    /// Write `value` to the register at `addr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not reachable or the bus
    /// transaction fails.
    fn write_byte(&mut self, addr: u32, value: u8) -> Result<(), Self::Error>;

    /// Read-modify-write: replace the bits selected by `mask` with `value`.
    ///
    /// Returns the value written. The two transactions are not atomic with
    /// respect to the hardware.
    ///
    /// # Errors
    ///
    /// Returns the first failing transaction's error; nothing is written if
    /// the read fails.
    fn update_bits(&mut self, addr: u32, mask: u8, value: u8) -> Result<u8, Self::Error> {
        let current = self.read_byte(addr)?;
        let updated = (current & !mask) | (value & mask);
        self.write_byte(addr, updated)?;
        Ok(updated)
    }
}

impl<B: PmicBus + ?Sized> PmicBus for &mut B {
    type Error = B::Error;

    fn read_byte(&mut self, addr: u32) -> Result<u8, Self::Error> {
        (**self).read_byte(addr)
    }

    fn write_byte(&mut self, addr: u32, value: u8) -> Result<(), Self::Error> {
        (**self).write_byte(addr, value)
    }
}
