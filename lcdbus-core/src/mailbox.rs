//! Latest-frame mailbox between interrupt and task context

use core::cell::Cell;
use critical_section::Mutex;
use portable_atomic::{AtomicU32, Ordering};

use crate::hal::{DisplaySink, FrameSink};
use crate::types::DisplayFrame;

/// Single-slot, latest-wins frame store
///
/// The decoder side posts from interrupt context; readers get the whole
/// frame from one critical section, never a mix of two frames. The
/// sequence number starts at 0 (nothing posted) and increases by one per
/// post, so it can be polled without taking the lock.
pub struct FrameMailbox {
    slot: Mutex<Cell<Option<DisplayFrame>>>,
    sequence: AtomicU32,
}

impl FrameMailbox {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Cell::new(None)),
            sequence: AtomicU32::new(0),
        }
    }

    /// Replace the stored frame; returns its sequence number
    pub fn post(&self, frame: DisplayFrame) -> u32 {
        critical_section::with(|cs| {
            self.slot.borrow(cs).set(Some(frame));
            self.sequence.fetch_add(1, Ordering::Release).wrapping_add(1)
        })
    }

    /// Sequence number of the stored frame, 0 if empty
    pub fn sequence(&self) -> u32 {
        self.sequence.load(Ordering::Acquire)
    }

    /// Most recent complete frame
    pub fn latest(&self) -> Option<DisplayFrame> {
        critical_section::with(|cs| self.slot.borrow(cs).get())
    }

    /// Most recent frame together with its sequence number
    pub fn latest_with_sequence(&self) -> Option<(u32, DisplayFrame)> {
        critical_section::with(|cs| {
            let frame = self.slot.borrow(cs).get()?;
            Some((self.sequence.load(Ordering::Relaxed), frame))
        })
    }

    /// The stored frame if it differs from sequence `seen`
    pub fn newer_than(&self, seen: u32) -> Option<(u32, DisplayFrame)> {
        if self.sequence() == seen {
            return None;
        }
        self.latest_with_sequence()
    }

    /// Drop the stored frame, keeping the sequence counter
    pub fn clear(&self) {
        critical_section::with(|cs| self.slot.borrow(cs).set(None));
    }
}

impl Default for FrameMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for FrameMailbox {
    fn publish(&mut self, frame: DisplayFrame) -> bool {
        self.post(frame);
        true
    }
}

impl FrameSink for &FrameMailbox {
    fn publish(&mut self, frame: DisplayFrame) -> bool {
        self.post(frame);
        true
    }
}

/// Present the mailbox frame if it is newer than `seen`
///
/// Returns Ok(true) when a frame was handed to the sink. `seen` only
/// advances on success so a failed present is retried next time.
pub fn present_latest<D: DisplaySink>(
    mailbox: &FrameMailbox,
    sink: &mut D,
    seen: &mut u32,
) -> Result<bool, D::Error> {
    match mailbox.newer_than(*seen) {
        Some((sequence, frame)) => {
            sink.present(&frame)?;
            *seen = sequence;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Async task draining the mailbox into a display
#[cfg(feature = "embassy-time")]
pub async fn presenter_task<D: DisplaySink>(
    mailbox: &FrameMailbox,
    mut sink: D,
    config: crate::types::DecoderConfig,
) {
    use embassy_time::Timer;

    let mut seen = 0u32;
    let interval = config.refresh_interval();

    loop {
        match present_latest(mailbox, &mut sink, &mut seen) {
            Ok(true) => {
                #[cfg(feature = "defmt")]
                defmt::trace!("Presented frame {}", seen);
            }
            Ok(false) => {}
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Display present failed");
            }
        }

        Timer::after(interval).await;
    }
}
