// Licensed under the Apache-2.0 license

//! Bounded completion polling.
//!
//! The arbiter has no completion interrupt on the polled path: software
//! spins on the channel STATUS register until it turns non-zero. Hardware
//! that never answers would hang boot, so every spin here is a bounded
//! counterpart of `nb::block!` with a budget expressed as a timeout and a
//! polling interval.

use embedded_hal::delay::DelayNs;
use fugit::MicrosDurationU32;

/// How long, and how often, to poll a channel status register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub timeout: MicrosDurationU32,
    pub interval: MicrosDurationU32,
}

/// Shortest interval a policy polls at.
pub const MIN_INTERVAL: MicrosDurationU32 = MicrosDurationU32::micros(1);

impl PollPolicy {
    /// An interval below [`MIN_INTERVAL`] is raised to it, so `timeout`
    /// stays a time budget rather than a count of back-to-back reads.
    #[must_use]
    pub const fn new(timeout: MicrosDurationU32, interval: MicrosDurationU32) -> Self {
        let interval = if interval.ticks() < MIN_INTERVAL.ticks() {
            MIN_INTERVAL
        } else {
            interval
        };
        Self { timeout, interval }
    }

    /// Number of status reads the budget allows; always at least one.
    ///
    /// A zero `interval` set directly on the field is treated as
    /// [`MIN_INTERVAL`].
    #[must_use]
    pub fn attempts(&self) -> u32 {
        let interval = self.interval.ticks().max(MIN_INTERVAL.ticks());
        (self.timeout.ticks() / interval).max(1)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            timeout: MicrosDurationU32::millis(10),
            interval: MicrosDurationU32::micros(1),
        }
    }
}

/// Failure of [`poll_bounded`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PollError<E> {
    /// The step kept returning `WouldBlock` for the whole budget.
    Expired,
    /// The step reported an error.
    Failed(E),
}

/// Run `step` until it completes, waiting `policy.interval` between tries.
///
/// # Errors
///
/// Returns [`PollError::Failed`] as soon as `step` fails, and
/// [`PollError::Expired`] once `policy.attempts()` tries all returned
/// `WouldBlock`.
pub fn poll_bounded<T, E, D, F>(
    policy: &PollPolicy,
    delay: &mut D,
    mut step: F,
) -> Result<T, PollError<E>>
where
    D: DelayNs,
    F: FnMut() -> nb::Result<T, E>,
{
    let attempts = policy.attempts();
    let interval = policy.interval.ticks();
    for attempt in 0..attempts {
        match step() {
            Ok(value) => return Ok(value),
            Err(nb::Error::Other(e)) => return Err(PollError::Failed(e)),
            Err(nb::Error::WouldBlock) => {}
        }
        if interval > 0 && attempt + 1 < attempts {
            delay.delay_us(interval);
        }
    }
    Err(PollError::Expired)
}
