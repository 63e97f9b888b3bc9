// Licensed under the Apache-2.0 license

//! SPMI PMIC arbiter driver.
//!
//! Moves single register reads and writes between the application processor
//! and PMIC peripherals behind a Qualcomm SPMI arbiter. [`BusSession`] scans
//! the channel descriptors once and then runs every transaction to
//! completion with bounded status polling. PMIC drivers talk to it through
//! [`PmicBus`].

pub mod address;
pub mod arbiter;
pub mod channel;
pub mod command;
pub mod config;
pub mod error;
pub mod poll;
pub mod registers;
pub mod traits;

// Register-level arbiter emulation
#[cfg(any(test, feature = "sandbox"))]
pub mod sandbox;

pub use address::PmicAddress;
pub use arbiter::BusSession;
pub use channel::{Channel, ChannelTable};
pub use command::{Opcode, Priority};
pub use config::{HwGeneration, SpmiConfig, SpmiConfigBuilder};
pub use error::{ErrorKind, SpmiError};
pub use poll::PollPolicy;
pub use registers::{ArbiterLayout, Mmio, RegisterAccess};
pub use traits::PmicBus;
