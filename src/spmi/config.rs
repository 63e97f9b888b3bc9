// Licensed under the Apache-2.0 license

//! Session configuration for the SPMI arbiter.

use fugit::MicrosDurationU32;

use super::command::{Addressing, Priority};
use super::poll::PollPolicy;
use super::registers::ArbiterLayout;

/// Arbiter hardware generation.
///
/// Both generations locate channels through the descriptor scan and share the
/// same transaction sequence; they differ in how much addressing a read
/// command has to carry.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum HwGeneration {
    /// Read commands spell out slave id and peripheral address.
    #[default]
    V1,
    /// The observer channel already routes reads; the command leaves the
    /// slave id and peripheral address fields clear.
    V2,
}

impl HwGeneration {
    /// Addressing mode for commands written to the core (write) half.
    #[must_use]
    pub const fn write_addressing(self) -> Addressing {
        Addressing::Explicit
    }

    /// Addressing mode for commands written to the observer (read) half.
    #[must_use]
    pub const fn read_addressing(self) -> Addressing {
        match self {
            HwGeneration::V1 => Addressing::Explicit,
            HwGeneration::V2 => Addressing::ChannelImplied,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SpmiConfig {
    pub generation: HwGeneration,
    pub priority: Priority,
    pub layout: ArbiterLayout,
    pub poll: PollPolicy,
}

impl Default for SpmiConfig {
    fn default() -> Self {
        SpmiConfigBuilder::new().build()
    }
}

pub struct SpmiConfigBuilder {
    generation: HwGeneration,
    priority: Priority,
    layout: ArbiterLayout,
    poll_timeout: MicrosDurationU32,
    poll_interval: MicrosDurationU32,
}

impl Default for SpmiConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SpmiConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        let poll = PollPolicy::default();
        Self {
            generation: HwGeneration::V1,
            priority: Priority::Low,
            layout: ArbiterLayout::APQ8016,
            poll_timeout: poll.timeout,
            poll_interval: poll.interval,
        }
    }
    #[must_use]
    pub fn generation(mut self, generation: HwGeneration) -> Self {
        self.generation = generation;
        self
    }
    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
    #[must_use]
    pub fn layout(mut self, layout: ArbiterLayout) -> Self {
        self.layout = layout;
        self
    }
    #[must_use]
    pub fn poll_timeout(mut self, timeout: MicrosDurationU32) -> Self {
        self.poll_timeout = timeout;
        self
    }
    /// Time between status reads. Zero is raised to
    /// [`MIN_INTERVAL`](super::poll::MIN_INTERVAL) at `build`.
    #[must_use]
    pub fn poll_interval(mut self, interval: MicrosDurationU32) -> Self {
        self.poll_interval = interval;
        self
    }
    #[must_use]
    pub fn build(self) -> SpmiConfig {
        SpmiConfig {
            generation: self.generation,
            priority: self.priority,
            layout: self.layout,
            poll: PollPolicy::new(self.poll_timeout, self.poll_interval),
        }
    }
}
