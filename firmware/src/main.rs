#![no_std]
#![no_main]

#[cfg(feature = "defmt")]
use defmt_rtt as _;

// RISC-V runtime
use riscv_rt as _;

// Panic handler
#[cfg(feature = "defmt")]
use panic_probe as _;
#[cfg(not(feature = "defmt"))]
use panic_halt as _;

use embassy_executor::Spawner;
use embassy_time::Duration;

use lcdbus_firmware::*;

/// Main firmware entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    #[cfg(feature = "defmt")]
    defmt::info!("🔧 LCD bus tap v{} starting...", lcdbus_core::VERSION);

    if let Err(_e) = init_hardware() {
        #[cfg(feature = "defmt")]
        defmt::error!("❌ Hardware init failed: {:?}", _e);
        return;
    }
    #[cfg(feature = "defmt")]
    defmt::info!("✅ Hardware initialized");

    let config = critical_section::with(|cs| *DECODER.borrow_ref(cs).config());
    #[cfg(feature = "defmt")]
    defmt::info!("⚙️ Decoder config: {:?}", config);

    #[cfg(feature = "defmt")]
    defmt::info!("🚀 Spawning tasks...");

    spawner.must_spawn(presenter_task_wrapper(&MAILBOX, LogDisplay::new(), config));
    spawner.must_spawn(stats_task(Duration::from_secs(5)));

    #[cfg(feature = "defmt")]
    defmt::info!("✨ Bus tap ready!");

    // Main supervision loop
    loop {
        embassy_time::Timer::after(Duration::from_secs(1)).await;
        #[cfg(feature = "defmt")]
        defmt::trace!("💓 Heartbeat");
    }
}
