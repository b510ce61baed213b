//! CH32V203 Hardware Implementation
//!
//! 64KB Flash / 20KB RAM. The tap board sits on the instrument's LCD
//! driver bus: O2 on PB1 raises EXTI1, the handler samples the other
//! lines from one GPIOB read and feeds the decoder.

use core::cell::RefCell;

use critical_section::Mutex;
use lcdbus_core::{BusSampler, ClockEdgeEvent, DecoderConfig, FrameDecoder, FrameMailbox, HalError};

use crate::time_driver;

/// Peripheral register map
mod regs {
    pub const RCC_BASE: u32 = 0x4002_1000;
    pub const RCC_APB2PCENR: u32 = 0x18;

    pub const AFIO_BASE: u32 = 0x4001_0000;
    pub const AFIO_EXTICR1: u32 = 0x08;

    pub const GPIOB_BASE: u32 = 0x4001_0C00;
    pub const GPIO_CFGLR: u32 = 0x00;
    pub const GPIO_CFGHR: u32 = 0x04;
    pub const GPIO_INDR: u32 = 0x08;

    pub const EXTI_BASE: u32 = 0x4001_0400;
    pub const EXTI_INTENR: u32 = 0x00;
    pub const EXTI_RTENR: u32 = 0x08;
    pub const EXTI_INTFR: u32 = 0x14;

    pub const PFIC_BASE: u32 = 0xE000_E000;
    pub const PFIC_IENR1: u32 = 0x100;

    pub const STK_BASE: u32 = 0xE000_F000;
    pub const STK_CTLR: u32 = 0x00;
    pub const STK_SR: u32 = 0x04;
    pub const STK_CNTL: u32 = 0x08;
    pub const STK_CMPLR: u32 = 0x10;

    /// Interrupt numbers in the PFIC
    pub const IRQ_SYSTICK: u32 = 12;
    pub const IRQ_EXTI1: u32 = 23;

    #[inline(always)]
    pub unsafe fn read(base: u32, offset: u32) -> u32 {
        core::ptr::read_volatile((base + offset) as *const u32)
    }

    #[inline(always)]
    pub unsafe fn write(base: u32, offset: u32, value: u32) {
        core::ptr::write_volatile((base + offset) as *mut u32, value)
    }

    #[inline(always)]
    pub unsafe fn modify(base: u32, offset: u32, f: impl FnOnce(u32) -> u32) {
        write(base, offset, f(read(base, offset)))
    }
}

/// Bus tap pin assignment (all on GPIOB)
pub mod pins {
    /// O2 clock, rising edge interrupt
    pub const O2_PIN: u8 = 1; // PB1

    /// SYNC, high during the command phase
    pub const SYNC_PIN: u8 = 11; // PB11

    /// PWO, high while the display is selected
    pub const PWO_PIN: u8 = 12; // PB12

    /// ISA, command bits
    pub const ISA_PIN: u8 = 14; // PB14

    /// INA, payload bits
    pub const INA_PIN: u8 = 15; // PB15

    /// PWO is active high on the instrument
    pub const PWO_ACTIVE_LOW: bool = false;
}

/// CH32V203-specific timing
pub mod timing {
    /// Core clock after reset (HSI, no PLL)
    pub const HCLK_HZ: u32 = 8_000_000;

    /// SysTick rate, matches the embassy tick rate
    pub const TICK_HZ: u32 = 1_000;
}

/// CH32V203 memory layout information
pub mod memory {
    /// Available Flash memory
    pub const FLASH_SIZE: u32 = 64 * 1024;

    /// Available RAM
    pub const RAM_SIZE: u32 = 20 * 1024;

    /// Embassy task arena size
    pub const TASK_ARENA_SIZE: u32 = 8 * 1024;
}

/// Decoder state, only touched from the O2 interrupt and diagnostics
pub static DECODER: Mutex<RefCell<FrameDecoder>> =
    Mutex::new(RefCell::new(FrameDecoder::new(DecoderConfig::DEFAULT)));

/// Finished frames for the presenter task
pub static MAILBOX: FrameMailbox = FrameMailbox::new();

/// Bus sampler over the GPIOB input register
///
/// All four lines come from one INDR read, so SYNC and the data bit are
/// from the same instant.
pub struct GpioBusSampler {
    pwo_active_low: bool,
}

impl GpioBusSampler {
    pub const fn new(pwo_active_low: bool) -> Self {
        Self { pwo_active_low }
    }

    /// Map a raw GPIOB input word to an edge sample
    pub fn edge_from_indr(&self, indr: u32) -> ClockEdgeEvent {
        let level = |pin: u8| indr & (1 << pin) != 0;
        let sync_high = level(pins::SYNC_PIN);
        let bit = if sync_high { level(pins::ISA_PIN) } else { level(pins::INA_PIN) };

        ClockEdgeEvent {
            bit,
            sync_high,
            power_asserted: level(pins::PWO_PIN) != self.pwo_active_low,
        }
    }
}

impl BusSampler for GpioBusSampler {
    type Error = HalError;

    fn sample(&mut self) -> Result<ClockEdgeEvent, Self::Error> {
        if !gpio_clock_enabled() {
            return Err(HalError::NotInitialized);
        }
        let indr = unsafe { regs::read(regs::GPIOB_BASE, regs::GPIO_INDR) };
        Ok(self.edge_from_indr(indr))
    }
}

fn gpio_clock_enabled() -> bool {
    // IOPBEN
    unsafe { regs::read(regs::RCC_BASE, regs::RCC_APB2PCENR) & (1 << 3) != 0 }
}

/// Bring up clocks, pins, EXTI1 and SysTick
pub fn init_hardware() -> Result<(), HalError> {
    if timing::HCLK_HZ % timing::TICK_HZ != 0 {
        return Err(HalError::InvalidConfig);
    }

    unsafe {
        // AFIO (bit 0) and GPIOB (bit 3)
        regs::modify(regs::RCC_BASE, regs::RCC_APB2PCENR, |v| v | (1 << 0) | (1 << 3));

        // Floating inputs: CNF=01, MODE=00
        regs::modify(regs::GPIOB_BASE, regs::GPIO_CFGLR, |v| {
            let shift = 4 * pins::O2_PIN as u32;
            (v & !(0xF << shift)) | (0x4 << shift)
        });
        regs::modify(regs::GPIOB_BASE, regs::GPIO_CFGHR, |mut v| {
            for pin in [pins::SYNC_PIN, pins::PWO_PIN, pins::ISA_PIN, pins::INA_PIN] {
                let shift = 4 * (pin as u32 - 8);
                v = (v & !(0xF << shift)) | (0x4 << shift);
            }
            v
        });

        // EXTI1 from port B, rising edge only
        regs::modify(regs::AFIO_BASE, regs::AFIO_EXTICR1, |v| (v & !(0xF << 4)) | (0x1 << 4));
        regs::modify(regs::EXTI_BASE, regs::EXTI_RTENR, |v| v | (1 << pins::O2_PIN));
        regs::write(regs::EXTI_BASE, regs::EXTI_INTFR, 1 << pins::O2_PIN);
        regs::modify(regs::EXTI_BASE, regs::EXTI_INTENR, |v| v | (1 << pins::O2_PIN));

        // SysTick: HCLK, auto reload, interrupt, enable
        regs::write(regs::STK_BASE, regs::STK_CNTL, 0);
        regs::write(regs::STK_BASE, regs::STK_CMPLR, timing::HCLK_HZ / timing::TICK_HZ - 1);
        regs::write(regs::STK_BASE, regs::STK_SR, 0);
        regs::write(regs::STK_BASE, regs::STK_CTLR, 0xF);

        regs::write(
            regs::PFIC_BASE,
            regs::PFIC_IENR1,
            (1 << regs::IRQ_SYSTICK) | (1 << regs::IRQ_EXTI1),
        );

        riscv::interrupt::enable();
    }

    #[cfg(feature = "defmt")]
    defmt::info!("🔌 CH32V203 bus tap initialized");

    Ok(())
}

/// Sample the bus and run one decoder step (O2 rising edge)
pub fn handle_o2_edge() {
    let mut sampler = GpioBusSampler::new(pins::PWO_ACTIVE_LOW);
    let edge = match sampler.sample() {
        Ok(edge) => edge,
        Err(_) => return,
    };

    critical_section::with(|cs| {
        let mut decoder = DECODER.borrow_ref_mut(cs);
        decoder.process_into(edge, &mut &MAILBOX);
    });
}

/// Copy of the decoder counters for diagnostics
pub fn decoder_stats() -> lcdbus_core::DecoderStats {
    critical_section::with(|cs| DECODER.borrow_ref(cs).stats())
}

// ========================================
// Interrupt Handlers
// ========================================

/// EXTI1 interrupt handler for O2 edges
#[no_mangle]
extern "C" fn EXTI1_IRQHandler() {
    unsafe { regs::write(regs::EXTI_BASE, regs::EXTI_INTFR, 1 << pins::O2_PIN) };
    handle_o2_edge();
}

/// SysTick interrupt handler, drives embassy time
#[no_mangle]
extern "C" fn SysTick() {
    unsafe { regs::write(regs::STK_BASE, regs::STK_SR, 0) };
    time_driver::on_tick();
}
