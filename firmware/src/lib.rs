#![no_std]

//! Firmware library for the LCD bus tap: display sinks and tasks

pub use embassy_executor::Spawner;
pub use embassy_time::Duration;

pub use lcdbus_core::*;

pub use crate::ch32v203_hardware::*;
pub use crate::log_display::*;
pub use crate::tasks::*;

// Display sink that mirrors frames to the debug probe
pub mod log_display {
    use lcdbus_core::{DisplayFrame, DisplaySink, HalError};

    /// Logs each presented frame over defmt
    #[derive(Debug, Default)]
    pub struct LogDisplay {
        presented: u32,
        last: Option<DisplayFrame>,
    }

    impl LogDisplay {
        pub const fn new() -> Self {
            Self { presented: 0, last: None }
        }

        /// Number of frames shown so far
        pub fn presented(&self) -> u32 {
            self.presented
        }
    }

    impl DisplaySink for LogDisplay {
        type Error = HalError;

        fn present(&mut self, frame: &DisplayFrame) -> Result<(), Self::Error> {
            if self.last.as_ref() == Some(frame) {
                return Ok(());
            }

            #[cfg(feature = "defmt")]
            {
                let text = frame.render();
                defmt::info!("📟 [{}]", text.as_str());
                for annunciator in frame.lit_annunciators() {
                    defmt::debug!("💡 {}", annunciator.name());
                }
            }

            self.presented = self.presented.wrapping_add(1);
            self.last = Some(*frame);
            Ok(())
        }
    }
}

// Embassy tasks module
pub mod tasks {
    use super::*;

    /// Presenter task wrapper
    #[embassy_executor::task]
    pub async fn presenter_task_wrapper(
        mailbox: &'static FrameMailbox,
        display: LogDisplay,
        config: DecoderConfig,
    ) {
        #[cfg(feature = "defmt")]
        defmt::info!("🖥️ Presenter task started ({} Hz)", config.refresh_hz());
        lcdbus_core::presenter_task(mailbox, display, config).await;
    }

    /// Periodic decoder health report
    #[embassy_executor::task]
    pub async fn stats_task(period: Duration) {
        let mut last_frames = 0u32;

        loop {
            embassy_time::Timer::after(period).await;
            let stats = crate::ch32v203_hardware::decoder_stats();

            if stats.frames == last_frames {
                #[cfg(feature = "defmt")]
                defmt::warn!("⏸️ No frames for {} ms", period.as_millis());
            }
            last_frames = stats.frames;

            #[cfg(feature = "defmt")]
            defmt::debug!(
                "📊 frames={} dropped={} abandoned={} orphan={}",
                stats.frames,
                stats.dropped_frames,
                stats.abandoned_payloads,
                stats.orphan_bytes
            );
        }
    }
}

// CH32V203 hardware module
pub mod ch32v203_hardware;

// Time driver for embassy
mod time_driver;
