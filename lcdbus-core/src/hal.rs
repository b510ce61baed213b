//! Hardware Abstraction Layer for the bus tap

use embedded_hal::digital::InputPin;
use heapless::spsc::Producer;

use crate::types::{ClockEdgeEvent, DisplayFrame};

/// Error types for HAL operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// GPIO read failed
    GpioError,
    /// Hardware not initialized
    NotInitialized,
    /// Invalid configuration
    InvalidConfig,
    /// Display device rejected a frame
    DisplayError,
}

#[cfg(feature = "std")]
impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HalError::GpioError => write!(f, "GPIO read failed"),
            HalError::NotInitialized => write!(f, "Hardware not initialized"),
            HalError::InvalidConfig => write!(f, "Invalid configuration"),
            HalError::DisplayError => write!(f, "Display rejected frame"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// Source of clock edge samples
pub trait BusSampler {
    type Error: From<HalError>;

    /// Sample SYNC, PWO and the active data line for the current edge
    fn sample(&mut self) -> Result<ClockEdgeEvent, Self::Error>;
}

/// Consumer of finished frames (panel driver, serial mirror, ...)
pub trait DisplaySink {
    type Error: From<HalError>;

    /// Show a complete frame
    fn present(&mut self, frame: &DisplayFrame) -> Result<(), Self::Error>;

    /// Blank the display
    fn clear(&mut self) -> Result<(), Self::Error> {
        self.present(&DisplayFrame::blank())
    }
}

/// Destination for frames produced in interrupt context
///
/// Must not block. Returns false if the frame was not accepted.
pub trait FrameSink {
    fn publish(&mut self, frame: DisplayFrame) -> bool;
}

impl<const N: usize> FrameSink for Producer<'_, DisplayFrame, N> {
    fn publish(&mut self, frame: DisplayFrame) -> bool {
        self.enqueue(frame).is_ok()
    }
}

/// Bus sampler over embedded-hal input pins
///
/// SYNC selects which data line is read: ISA in the command phase, INA in
/// the data phase.
pub struct EmbeddedHalBusSampler<SYNC, PWO, ISA, INA> {
    sync: SYNC,
    pwo: PWO,
    isa: ISA,
    ina: INA,
    pwo_active_low: bool,
}

impl<SYNC, PWO, ISA, INA> EmbeddedHalBusSampler<SYNC, PWO, ISA, INA>
where
    SYNC: InputPin,
    PWO: InputPin,
    ISA: InputPin,
    INA: InputPin,
{
    pub fn new(sync: SYNC, pwo: PWO, isa: ISA, ina: INA, pwo_active_low: bool) -> Self {
        Self { sync, pwo, isa, ina, pwo_active_low }
    }

    /// Give the pins back
    pub fn release(self) -> (SYNC, PWO, ISA, INA) {
        (self.sync, self.pwo, self.isa, self.ina)
    }
}

impl<SYNC, PWO, ISA, INA> BusSampler for EmbeddedHalBusSampler<SYNC, PWO, ISA, INA>
where
    SYNC: InputPin,
    PWO: InputPin,
    ISA: InputPin,
    INA: InputPin,
{
    type Error = HalError;

    fn sample(&mut self) -> Result<ClockEdgeEvent, Self::Error> {
        let sync_high = self.sync.is_high().map_err(|_| HalError::GpioError)?;
        let pwo_high = self.pwo.is_high().map_err(|_| HalError::GpioError)?;
        let bit = if sync_high {
            self.isa.is_high().map_err(|_| HalError::GpioError)?
        } else {
            self.ina.is_high().map_err(|_| HalError::GpioError)?
        };

        Ok(ClockEdgeEvent {
            bit,
            sync_high,
            power_asserted: pwo_high != self.pwo_active_low,
        })
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Mock implementations for testing

    use super::*;
    use core::cell::RefCell;
    use heapless::Vec;

    /// Replays a fixed edge sequence
    pub struct MockBusSampler<const N: usize> {
        edges: Vec<ClockEdgeEvent, N>,
        cursor: usize,
    }

    impl<const N: usize> MockBusSampler<N> {
        pub fn new(edges: &[ClockEdgeEvent]) -> Self {
            let mut buffer = Vec::new();
            for edge in edges.iter().take(N) {
                let _ = buffer.push(*edge);
            }
            Self { edges: buffer, cursor: 0 }
        }

        pub fn remaining(&self) -> usize {
            self.edges.len() - self.cursor
        }
    }

    impl<const N: usize> BusSampler for MockBusSampler<N> {
        type Error = HalError;

        fn sample(&mut self) -> Result<ClockEdgeEvent, Self::Error> {
            let edge = self.edges.get(self.cursor).copied().ok_or(HalError::NotInitialized)?;
            self.cursor += 1;
            Ok(edge)
        }
    }

    /// Records presented frames
    #[derive(Default)]
    pub struct MockDisplay {
        frames: RefCell<Vec<DisplayFrame, 16>>,
        fail: RefCell<bool>,
    }

    impl MockDisplay {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make the next presents fail
        pub fn set_failing(&self, fail: bool) {
            *self.fail.borrow_mut() = fail;
        }

        pub fn presented(&self) -> usize {
            self.frames.borrow().len()
        }

        pub fn last(&self) -> Option<DisplayFrame> {
            self.frames.borrow().last().copied()
        }
    }

    impl DisplaySink for MockDisplay {
        type Error = HalError;

        fn present(&mut self, frame: &DisplayFrame) -> Result<(), Self::Error> {
            if *self.fail.borrow() {
                return Err(HalError::DisplayError);
            }
            self.frames.borrow_mut().push(*frame).map_err(|_| HalError::DisplayError)
        }
    }
}
