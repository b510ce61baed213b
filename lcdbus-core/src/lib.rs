#![cfg_attr(not(feature = "std"), no_std)]

//! # LCD Bus Core
//!
//! Decoder for the synchronous LCD driver bus of a benchtop multimeter.
//! Turns O2 clock edges into 12-character display frames with punctuation
//! and annunciator flags.

pub mod types;
pub mod registers;
pub mod charset;
pub mod fsm;
pub mod mailbox;
pub mod hal;
pub mod clock;

#[cfg(feature = "test-utils")]
pub mod test_utils;


pub use types::*;
pub use registers::RegisterBank;
pub use charset::{decode_frame, Digit};
pub use fsm::*;
pub use mailbox::*;
pub use hal::*;
pub use clock::TickClock;

/// Decoder library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration matching what the instrument shows
pub fn default_config() -> DecoderConfig {
    DecoderConfig::DEFAULT
}
