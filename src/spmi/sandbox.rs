// Licensed under the Apache-2.0 license

//! Register-level emulation of an arbiter with a PM8916-like PMIC behind it.
//!
//! [`Sandbox`] implements [`RegisterAccess`], so a [`BusSession`] runs on it
//! unchanged: the descriptor bank reports which pair each channel serves,
//! CMD0 writes execute against the emulated peripherals and STATUS, WDATA
//! and RDATA behave like the hardware's.
//!
//! Emulated peripherals:
//!
//! * PON on slave 0, peripheral 0x08. INT_RT_STS (0x10) is read-only.
//! * GPIO1..GPIO4 on slave 0, peripherals 0xC0..=0xC3. Registers past
//!   EN_CTL (0x46) do not exist. Writing MODE_CTL in output or in/out mode
//!   mirrors the output level into STATUS, and a disabled block reads as
//!   zero.
//! * A plain register file on slave 1, peripheral 0x40, every offset
//!   readable and writable.
//!
//! Faults can be injected per channel half to drive the error paths.
//!
//! [`BusSession`]: super::arbiter::BusSession

use super::address::PmicAddress;
use super::channel::{encode_descriptor, Channel};
use super::command::{Command, Opcode};
use super::config::HwGeneration;
use super::registers::{
    ArbiterLayout, ChannelReg, Half, RegisterAccess, DATA_REG_BYTES, MAX_PERIPH, MAX_READ_BYTES,
    MAX_WRITE_BYTES, RDATA_REGS, STATUS_DENIED, STATUS_DONE, STATUS_DROPPED, STATUS_FAILURE,
    WDATA_REGS,
};

/// Power-on peripheral id.
pub const PON_PID: u8 = 0x08;
/// First GPIO peripheral id.
pub const GPIO_PID_START: u8 = 0xC0;
/// Number of emulated GPIO peripherals.
pub const GPIO_COUNT: usize = 4;
/// Slave id of the plain register file.
pub const SCRATCH_SLAVE: u8 = 1;
/// Peripheral id of the plain register file.
pub const SCRATCH_PID: u8 = 0x40;

const GPIO_STATUS: u8 = 0x08;
const GPIO_MODE_CTL: u8 = 0x40;
const GPIO_EN_CTL: u8 = 0x46;
const PON_INT_RT_STS: u8 = 0x10;

const PERM_R: u8 = 0x1;
const PERM_W: u8 = 0x2;
const PERM_RW: u8 = PERM_R | PERM_W;

const PERIPHERALS: usize = GPIO_COUNT + 2;
const REGS_PER_PERIPHERAL: usize = 256;

/// A fault injected into one channel half.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Every command completes with this raw STATUS value.
    Status(u32),
    /// STATUS never leaves zero.
    Stuck,
}

#[derive(Copy, Clone, Debug)]
struct ChannelState {
    config: u32,
    status: u32,
    cmd0: u32,
    wdata: [u32; WDATA_REGS],
    rdata: [u32; RDATA_REGS],
    busy: u32,
    fault: Option<Fault>,
}

impl ChannelState {
    const RESET: Self = Self {
        // completion routed to the interrupt controller out of reset
        config: 1,
        status: 0,
        cmd0: 0,
        wdata: [0; WDATA_REGS],
        rdata: [0; RDATA_REGS],
        busy: 0,
        fault: None,
    };
}

#[derive(Copy, Clone, Debug, Default)]
struct FakeReg {
    value: u8,
    access_mask: u8,
    perms: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Model {
    Pon,
    Gpio,
    Memory,
}

struct Peripheral {
    slave_id: u8,
    peripheral_id: u8,
    channel: Channel,
    model: Model,
    regs: [FakeReg; REGS_PER_PERIPHERAL],
}

impl Peripheral {
    fn new(slave_id: u8, peripheral_id: u8, channel: Channel, model: Model) -> Self {
        let mut p = Self {
            slave_id,
            peripheral_id,
            channel,
            model,
            regs: [FakeReg::default(); REGS_PER_PERIPHERAL],
        };
        match model {
            Model::Pon => {
                p.preset(PON_INT_RT_STS, 0, 0xFF, PERM_R);
            }
            Model::Gpio => {
                p.preset(0x04, 0x10, 0x00, PERM_R);
                p.preset(0x05, 0x05, 0x00, PERM_R);
                p.preset(GPIO_STATUS, 0x00, 0x81, PERM_RW);
                p.preset(GPIO_MODE_CTL, 0x00, 0x7F, PERM_RW);
                p.preset(0x41, 0x00, 0x07, PERM_RW);
                p.preset(0x42, 0x04, 0x07, PERM_RW);
                p.preset(0x45, 0x01, 0x3F, PERM_RW);
                p.preset(GPIO_EN_CTL, 0x80, 0x80, PERM_RW);
            }
            Model::Memory => {
                for reg in &mut p.regs {
                    *reg = FakeReg {
                        value: 0,
                        access_mask: 0xFF,
                        perms: PERM_RW,
                    };
                }
            }
        }
        p
    }

    fn preset(&mut self, offset: u8, value: u8, access_mask: u8, perms: u8) {
        if let Some(reg) = self.regs.get_mut(usize::from(offset)) {
            *reg = FakeReg {
                value,
                access_mask,
                perms,
            };
        }
    }

    fn reg(&self, offset: u8) -> FakeReg {
        self.regs
            .get(usize::from(offset))
            .copied()
            .unwrap_or_default()
    }

    fn exists(&self, offset: u8) -> bool {
        match self.model {
            Model::Gpio => offset <= GPIO_EN_CTL,
            Model::Pon | Model::Memory => true,
        }
    }

    fn read(&self, offset: u8) -> u8 {
        if self.model == Model::Gpio && self.reg(GPIO_EN_CTL).value == 0 {
            return 0;
        }
        let reg = self.reg(offset);
        if reg.perms & PERM_R != 0 {
            reg.value
        } else {
            0
        }
    }

    fn write(&mut self, offset: u8, value: u8) {
        if self.model == Model::Gpio && offset == GPIO_MODE_CTL {
            let value = value & self.reg(GPIO_MODE_CTL).access_mask;
            // output or in/out mode drives the pin
            if matches!(value & 0x30, 0x10 | 0x20) {
                if let Some(status) = self.regs.get_mut(usize::from(GPIO_STATUS)) {
                    status.value = (status.value & !0x1) | (value & 0x1);
                }
            }
        }
        if let Some(reg) = self.regs.get_mut(usize::from(offset)) {
            if reg.perms & PERM_W != 0 {
                reg.value = value & reg.access_mask;
            }
        }
    }
}

/// Emulated arbiter and PMIC.
pub struct Sandbox {
    layout: ArbiterLayout,
    generation: HwGeneration,
    core: [ChannelState; MAX_PERIPH],
    observer: [ChannelState; MAX_PERIPH],
    peripherals: [Peripheral; PERIPHERALS],
    busy_polls: u32,
    commands: usize,
}

impl Sandbox {
    /// PON on channel 1, GPIO1..GPIO4 on channels 2..=5 and the register
    /// file on channel 6. All other descriptors read as zero.
    #[must_use]
    pub fn pm8916(layout: ArbiterLayout, generation: HwGeneration) -> Self {
        let peripherals = core::array::from_fn(|i| match i {
            0 => Peripheral::new(0, PON_PID, 1, Model::Pon),
            n if n <= GPIO_COUNT => {
                let gpio = n as u8 - 1;
                Peripheral::new(0, GPIO_PID_START + gpio, 2 + gpio, Model::Gpio)
            }
            _ => Peripheral::new(SCRATCH_SLAVE, SCRATCH_PID, 6, Model::Memory),
        });
        Self {
            layout,
            generation,
            core: [ChannelState::RESET; MAX_PERIPH],
            observer: [ChannelState::RESET; MAX_PERIPH],
            peripherals,
            busy_polls: 0,
            commands: 0,
        }
    }

    /// Report STATUS as busy for `polls` reads after every command.
    pub fn set_busy_polls(&mut self, polls: u32) {
        self.busy_polls = polls;
    }

    pub fn inject(&mut self, half: Half, channel: Channel, fault: Fault) {
        if let Some(state) = self.state_mut(half, channel) {
            state.fault = Some(fault);
        }
    }

    pub fn clear_faults(&mut self) {
        for state in self.core.iter_mut().chain(self.observer.iter_mut()) {
            state.fault = None;
        }
    }

    /// Channel wired to `(slave_id, peripheral_id)`.
    #[must_use]
    pub fn channel_of(&self, slave_id: u8, peripheral_id: u8) -> Option<Channel> {
        self.peripheral(slave_id, peripheral_id).map(|p| p.channel)
    }

    /// Number of CMD0 writes seen so far.
    #[must_use]
    pub fn commands_issued(&self) -> usize {
        self.commands
    }

    #[must_use]
    pub fn config(&self, half: Half, channel: Channel) -> u32 {
        self.state(half, channel).map_or(0, |s| s.config)
    }

    /// Last command word written to the channel.
    #[must_use]
    pub fn cmd0(&self, half: Half, channel: Channel) -> u32 {
        self.state(half, channel).map_or(0, |s| s.cmd0)
    }

    #[must_use]
    pub fn wdata(&self, half: Half, channel: Channel, n: usize) -> u32 {
        self.state(half, channel)
            .and_then(|s| s.wdata.get(n).copied())
            .unwrap_or(0)
    }

    /// Raw register value, bypassing permissions and enable state.
    #[must_use]
    pub fn peek(&self, addr: PmicAddress) -> Option<u8> {
        self.peripheral(addr.slave_id, addr.peripheral_id)
            .filter(|p| p.exists(addr.offset))
            .map(|p| p.reg(addr.offset).value)
    }

    /// Set a register behind the bus's back. Unknown addresses are ignored.
    pub fn poke(&mut self, addr: PmicAddress, value: u8) {
        if let Some(reg) = self
            .peripheral_mut(addr.slave_id, addr.peripheral_id)
            .and_then(|p| p.regs.get_mut(usize::from(addr.offset)))
        {
            reg.value = value;
        }
    }

    fn peripheral(&self, slave_id: u8, peripheral_id: u8) -> Option<&Peripheral> {
        self.peripherals
            .iter()
            .find(|p| p.slave_id == slave_id && p.peripheral_id == peripheral_id)
    }

    fn peripheral_mut(&mut self, slave_id: u8, peripheral_id: u8) -> Option<&mut Peripheral> {
        self.peripherals
            .iter_mut()
            .find(|p| p.slave_id == slave_id && p.peripheral_id == peripheral_id)
    }

    fn descriptor(&self, index: usize) -> u32 {
        self.peripherals
            .iter()
            .rev()
            .find(|p| usize::from(p.channel) == index)
            .map_or(0, |p| encode_descriptor(p.slave_id, p.peripheral_id))
    }

    fn state(&self, half: Half, channel: Channel) -> Option<&ChannelState> {
        match half {
            Half::Core => self.core.get(usize::from(channel)),
            Half::Observer => self.observer.get(usize::from(channel)),
        }
    }

    fn state_mut(&mut self, half: Half, channel: Channel) -> Option<&mut ChannelState> {
        match half {
            Half::Core => self.core.get_mut(usize::from(channel)),
            Half::Observer => self.observer.get_mut(usize::from(channel)),
        }
    }

    fn read_status(&mut self, half: Half, channel: Channel) -> u32 {
        let Some(state) = self.state_mut(half, channel) else {
            return 0;
        };
        if state.fault == Some(Fault::Stuck) {
            return 0;
        }
        if state.busy > 0 {
            state.busy -= 1;
            return 0;
        }
        state.status
    }

    fn issue(&mut self, half: Half, channel: Channel, word: u32) {
        self.commands += 1;
        let busy = self.busy_polls;
        let Some(state) = self.state_mut(half, channel) else {
            return;
        };
        state.cmd0 = word;
        state.busy = busy;
        let (fault, wdata) = (state.fault, state.wdata);

        let mut rdata = [0u32; RDATA_REGS];
        let status = match fault {
            Some(Fault::Status(status)) => status,
            Some(Fault::Stuck) => 0,
            None => self.execute(half, channel, word, wdata, &mut rdata),
        };

        if let Some(state) = self.state_mut(half, channel) {
            state.status = status;
            if status == STATUS_DONE && half == Half::Observer {
                state.rdata = rdata;
            }
        }
    }

    fn execute(
        &mut self,
        half: Half,
        channel: Channel,
        word: u32,
        wdata: [u32; WDATA_REGS],
        rdata: &mut [u32; RDATA_REGS],
    ) -> u32 {
        let Some(cmd) = Command::from_word(word) else {
            return STATUS_FAILURE;
        };
        let implied_ok = self.generation == HwGeneration::V2 && half == Half::Observer;
        let Some(periph) = self.peripherals.iter_mut().find(|p| p.channel == channel) else {
            return STATUS_DROPPED;
        };

        let addressed = cmd.slave_id == periph.slave_id && cmd.address == periph.peripheral_id;
        let implied = implied_ok && cmd.slave_id == 0 && cmd.address == 0;
        if !addressed && !implied {
            return STATUS_DENIED;
        }

        let size = cmd.size();
        let last = usize::from(cmd.offset) + size - 1;
        let in_range = u8::try_from(last).is_ok_and(|last| periph.exists(last));

        match (half, cmd.opcode) {
            (Half::Core, Opcode::ExtRegWriteLong) => {
                if size > MAX_WRITE_BYTES || !in_range {
                    return STATUS_FAILURE;
                }
                let bytes = wdata.iter().flat_map(|w| w.to_le_bytes());
                for (offset, value) in (usize::from(cmd.offset)..=last).zip(bytes) {
                    periph.write(offset as u8, value);
                }
                STATUS_DONE
            }
            (Half::Observer, Opcode::ExtRegReadLong) => {
                if size > MAX_READ_BYTES || !in_range {
                    return STATUS_FAILURE;
                }
                let mut bytes = [0u8; MAX_READ_BYTES];
                for (offset, dst) in (usize::from(cmd.offset)..=last).zip(bytes.iter_mut()) {
                    *dst = periph.read(offset as u8);
                }
                for (word, chunk) in rdata.iter_mut().zip(bytes.chunks(DATA_REG_BYTES)) {
                    let mut le = [0u8; DATA_REG_BYTES];
                    le.copy_from_slice(chunk);
                    *word = u32::from_le_bytes(le);
                }
                STATUS_DONE
            }
            (_, Opcode::ExtRegWriteLong | Opcode::ExtRegReadLong) => STATUS_DENIED,
            _ => STATUS_FAILURE,
        }
    }
}

impl RegisterAccess for Sandbox {
    fn read32(&mut self, addr: usize) -> u32 {
        if let Some(index) = self.layout.descriptor_index(addr) {
            return self.descriptor(index);
        }
        let Some((half, channel, reg)) = self.layout.locate(addr) else {
            return 0;
        };
        if reg == ChannelReg::Status {
            return self.read_status(half, channel);
        }
        let Some(state) = self.state(half, channel) else {
            return 0;
        };
        match reg {
            ChannelReg::Cmd0 => state.cmd0,
            ChannelReg::Config => state.config,
            ChannelReg::Wdata(n) => state.wdata.get(usize::from(n)).copied().unwrap_or(0),
            ChannelReg::Rdata(n) => state.rdata.get(usize::from(n)).copied().unwrap_or(0),
            ChannelReg::Status => 0,
        }
    }

    fn write32(&mut self, addr: usize, value: u32) {
        let Some((half, channel, reg)) = self.layout.locate(addr) else {
            return;
        };
        if reg == ChannelReg::Cmd0 {
            self.issue(half, channel, value);
            return;
        }
        let Some(state) = self.state_mut(half, channel) else {
            return;
        };
        match reg {
            ChannelReg::Config => state.config = value,
            ChannelReg::Wdata(n) => {
                if let Some(w) = state.wdata.get_mut(usize::from(n)) {
                    *w = value;
                }
            }
            // read-only
            ChannelReg::Cmd0 | ChannelReg::Status | ChannelReg::Rdata(_) => {}
        }
    }
}
