// Licensed under the Apache-2.0 license

//! Arbiter register map and the raw register access seam.
//!
//! Every channel owns two identical register windows: the *core* half, used
//! for writes, and the *observer* half, used for reads. Within a window the
//! channel registers sit at fixed offsets; windows of consecutive channels are
//! `channel_stride` bytes apart.
//!
//! | Register   | Offset        |
//! |------------|---------------|
//! | CMD0       | 0x00          |
//! | CONFIG     | 0x04          |
//! | STATUS     | 0x08          |
//! | WDATA(n)   | 0x10 + 4n     |
//! | RDATA(n)   | 0x18 + 4n     |
//!
//! A separate bank of `MAX_PERIPH` descriptor registers in the arbiter core
//! reports which (slave, peripheral) pair each channel is wired to.

/// Number of channel descriptors the arbiter exposes.
pub const MAX_PERIPH: usize = 128;

/// Number of WDATA registers per channel.
pub const WDATA_REGS: usize = 2;
/// Number of RDATA registers per channel.
pub const RDATA_REGS: usize = 3;
/// Bytes carried by one data register.
pub const DATA_REG_BYTES: usize = 4;

/// Largest write a single command can carry.
pub const MAX_WRITE_BYTES: usize = WDATA_REGS * DATA_REG_BYTES;
/// Largest read a single command can return.
pub const MAX_READ_BYTES: usize = RDATA_REGS * DATA_REG_BYTES;

/// STATUS value reporting successful completion. Zero means still busy.
pub const STATUS_DONE: u32 = 1 << 0;
/// STATUS bit: the slave rejected or failed the command.
pub const STATUS_FAILURE: u32 = 1 << 1;
/// STATUS bit: the channel is not allowed to issue the command.
pub const STATUS_DENIED: u32 = 1 << 2;
/// STATUS bit: the arbiter dropped the command.
pub const STATUS_DROPPED: u32 = 1 << 3;

const CMD0_OFFSET: usize = 0x00;
const CONFIG_OFFSET: usize = 0x04;
const STATUS_OFFSET: usize = 0x08;
const WDATA_OFFSET: usize = 0x10;
const RDATA_OFFSET: usize = 0x18;

const DESCRIPTOR_OFFSET: usize = 0x800;

/// A register inside a channel window.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChannelReg {
    Cmd0,
    Config,
    Status,
    Wdata(u8),
    Rdata(u8),
}

impl ChannelReg {
    /// Byte offset from the start of the channel window.
    #[must_use]
    pub const fn offset(self) -> usize {
        match self {
            ChannelReg::Cmd0 => CMD0_OFFSET,
            ChannelReg::Config => CONFIG_OFFSET,
            ChannelReg::Status => STATUS_OFFSET,
            ChannelReg::Wdata(n) => WDATA_OFFSET + DATA_REG_BYTES * n as usize,
            ChannelReg::Rdata(n) => RDATA_OFFSET + DATA_REG_BYTES * n as usize,
        }
    }

    /// Inverse of [`ChannelReg::offset`] for offsets inside the window.
    #[must_use]
    pub const fn from_offset(offset: usize) -> Option<Self> {
        match offset {
            CMD0_OFFSET => Some(ChannelReg::Cmd0),
            CONFIG_OFFSET => Some(ChannelReg::Config),
            STATUS_OFFSET => Some(ChannelReg::Status),
            0x10 | 0x14 => Some(ChannelReg::Wdata(((offset - WDATA_OFFSET) / 4) as u8)),
            0x18 | 0x1C | 0x20 => Some(ChannelReg::Rdata(((offset - RDATA_OFFSET) / 4) as u8)),
            _ => None,
        }
    }
}

/// Which of the two channel windows an access goes to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Half {
    /// Write path.
    Core,
    /// Read path.
    Observer,
}

/// Physical placement of the arbiter register banks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ArbiterLayout {
    /// Base of the channel descriptor bank's parent block.
    pub arb_core_base: usize,
    /// Channel 0 window of the core half.
    pub core_base: usize,
    /// Channel 0 window of the observer half.
    pub observer_base: usize,
    /// Distance between consecutive channel windows.
    pub channel_stride: usize,
}

impl ArbiterLayout {
    /// PMIC arbiter of the Qualcomm APQ8016 (Snapdragon 410).
    pub const APQ8016: Self = Self::from_spmi_base(0x0200_0000, 0x0200_F000);

    /// Layout used by the APQ8016 family relative to the SPMI block base.
    #[must_use]
    pub const fn from_spmi_base(spmi_base: usize, arb_core_base: usize) -> Self {
        Self {
            arb_core_base,
            core_base: spmi_base + 0x0040_0000,
            observer_base: spmi_base + 0x00C0_0000,
            channel_stride: 0x8000,
        }
    }

    /// Address of descriptor register `index`.
    #[must_use]
    pub const fn descriptor(&self, index: usize) -> usize {
        self.arb_core_base + DESCRIPTOR_OFFSET + 4 * index
    }

    /// Address of `reg` in `half` for `channel`.
    #[must_use]
    pub const fn channel_reg(&self, half: Half, channel: u8, reg: ChannelReg) -> usize {
        let base = match half {
            Half::Core => self.core_base,
            Half::Observer => self.observer_base,
        };
        base + channel as usize * self.channel_stride + reg.offset()
    }

    /// Reverse lookup of an absolute address into a channel register.
    ///
    /// Returns `None` for addresses outside both halves or between registers.
    #[must_use]
    pub fn locate(&self, addr: usize) -> Option<(Half, u8, ChannelReg)> {
        let window = self.channel_stride * MAX_PERIPH;
        let (half, rel) = if addr >= self.core_base && addr < self.core_base + window {
            (Half::Core, addr - self.core_base)
        } else if addr >= self.observer_base && addr < self.observer_base + window {
            (Half::Observer, addr - self.observer_base)
        } else {
            return None;
        };
        let channel = u8::try_from(rel / self.channel_stride).ok()?;
        let reg = ChannelReg::from_offset(rel % self.channel_stride)?;
        Some((half, channel, reg))
    }

    /// Reverse lookup of a descriptor register address into its index.
    #[must_use]
    pub fn descriptor_index(&self, addr: usize) -> Option<usize> {
        let start = self.descriptor(0);
        if addr < start || (addr - start) % 4 != 0 {
            return None;
        }
        let index = (addr - start) / 4;
        (index < MAX_PERIPH).then_some(index)
    }
}

impl Default for ArbiterLayout {
    fn default() -> Self {
        Self::APQ8016
    }
}

/// 32-bit register access used by the arbiter.
///
/// Implemented by [`Mmio`] on hardware and by emulators or mocks in tests.
pub trait RegisterAccess {
    fn read32(&mut self, addr: usize) -> u32;
    fn write32(&mut self, addr: usize, value: u32);
}

impl<R: RegisterAccess + ?Sized> RegisterAccess for &mut R {
    fn read32(&mut self, addr: usize) -> u32 {
        (**self).read32(addr)
    }

    fn write32(&mut self, addr: usize, value: u32) {
        (**self).write32(addr, value);
    }
}

/// Volatile access to physical memory-mapped registers.
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// # Safety
    ///
    /// Every address later passed to [`RegisterAccess`] must be a mapped,
    /// 4-byte aligned device register, and nothing else may drive the
    /// arbiter while this handle is alive.
    #[must_use]
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl RegisterAccess for Mmio {
    fn read32(&mut self, addr: usize) -> u32 {
        // SAFETY: upheld by the contract of `Mmio::new`.
        unsafe { core::ptr::read_volatile(addr as *const u32) }
    }

    fn write32(&mut self, addr: usize, value: u32) {
        // SAFETY: upheld by the contract of `Mmio::new`.
        unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apq8016_channel_addresses() {
        let layout = ArbiterLayout::APQ8016;

        assert_eq!(layout.channel_reg(Half::Core, 0, ChannelReg::Cmd0), 0x0240_0000);
        assert_eq!(layout.channel_reg(Half::Core, 3, ChannelReg::Config), 0x0241_8004);
        assert_eq!(
            layout.channel_reg(Half::Observer, 1, ChannelReg::Status),
            0x02C0_8008
        );
        assert_eq!(
            layout.channel_reg(Half::Core, 2, ChannelReg::Wdata(1)),
            0x0241_0014
        );
        assert_eq!(
            layout.channel_reg(Half::Observer, 0, ChannelReg::Rdata(2)),
            0x02C0_0020
        );
    }

    #[test]
    fn test_descriptor_addresses() {
        let layout = ArbiterLayout::APQ8016;
        assert_eq!(layout.descriptor(0), 0x0200_F800);
        assert_eq!(layout.descriptor(127), 0x0200_F9FC);
        assert_eq!(layout.descriptor_index(0x0200_F814), Some(5));
        assert_eq!(layout.descriptor_index(0x0200_FA00), None);
        assert_eq!(layout.descriptor_index(0x0200_F801), None);
    }

    #[test]
    fn test_locate_inverts_channel_reg() {
        let layout = ArbiterLayout::APQ8016;
        let regs = [
            ChannelReg::Cmd0,
            ChannelReg::Config,
            ChannelReg::Status,
            ChannelReg::Wdata(0),
            ChannelReg::Wdata(1),
            ChannelReg::Rdata(0),
            ChannelReg::Rdata(1),
            ChannelReg::Rdata(2),
        ];
        for half in [Half::Core, Half::Observer] {
            for channel in [0u8, 1, 64, 127] {
                for reg in regs {
                    let addr = layout.channel_reg(half, channel, reg);
                    assert_eq!(layout.locate(addr), Some((half, channel, reg)));
                }
            }
        }
    }

    #[test]
    fn test_locate_rejects_gaps_and_foreign_addresses() {
        let layout = ArbiterLayout::APQ8016;
        assert_eq!(layout.locate(0x0240_000C), None);
        assert_eq!(layout.locate(0x0240_0024), None);
        assert_eq!(layout.locate(0x0200_F800), None);
    }

    #[test]
    fn test_data_capacity() {
        assert_eq!(MAX_WRITE_BYTES, 8);
        assert_eq!(MAX_READ_BYTES, 12);
    }
}
