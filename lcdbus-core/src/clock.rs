//! Monotonic tick bookkeeping for a single-alarm time driver
//!
//! The count is 64-bit so a millisecond tick never wraps in practice.

/// Tick count plus one armed deadline
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickClock {
    now: u64,
    deadline: u64,
}

impl TickClock {
    const DISARMED: u64 = u64::MAX;

    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    /// Clock already at `now` ticks, nothing armed
    pub const fn starting_at(now: u64) -> Self {
        Self {
            now,
            deadline: Self::DISARMED,
        }
    }

    pub const fn now(&self) -> u64 {
        self.now
    }

    /// Armed deadline, if any
    pub const fn deadline(&self) -> Option<u64> {
        if self.deadline == Self::DISARMED {
            None
        } else {
            Some(self.deadline)
        }
    }

    /// Advance one tick. Returns true once when the armed deadline is reached.
    pub fn tick(&mut self) -> bool {
        self.now = self.now.saturating_add(1);
        if self.now < self.deadline {
            return false;
        }
        self.deadline = Self::DISARMED;
        true
    }

    /// Arm the deadline. Returns false, leaving nothing armed, if it has already passed.
    pub fn arm(&mut self, deadline: u64) -> bool {
        if deadline <= self.now {
            self.deadline = Self::DISARMED;
            false
        } else {
            self.deadline = deadline;
            true
        }
    }

    pub fn disarm(&mut self) {
        self.deadline = Self::DISARMED;
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}
