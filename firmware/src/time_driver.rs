//! SysTick-driven embassy time driver for CH32V203
//!
//! One tick per millisecond, one alarm slot. The executor only ever asks
//! for a single alarm with the generic timer queue.

use core::cell::{Cell, RefCell};

use critical_section::Mutex;
use embassy_time_driver::{AlarmHandle, Driver};
use lcdbus_core::TickClock;
use portable_atomic::{AtomicBool, Ordering};

/// Millisecond tick counter with a single alarm
pub struct SysTickDriver {
    clock: Mutex<RefCell<TickClock>>,
    callback: Mutex<Cell<Option<(fn(*mut ()), usize)>>>,
    allocated: AtomicBool,
}

impl SysTickDriver {
    const fn new() -> Self {
        Self {
            clock: Mutex::new(RefCell::new(TickClock::new())),
            callback: Mutex::new(Cell::new(None)),
            allocated: AtomicBool::new(false),
        }
    }

    /// Advance time and fire the alarm if due (SysTick interrupt)
    fn tick(&self) {
        let due = critical_section::with(|cs| {
            if self.clock.borrow_ref_mut(cs).tick() {
                self.callback.borrow(cs).get()
            } else {
                None
            }
        });

        if let Some((callback, ctx)) = due {
            callback(ctx as *mut ());
        }
    }
}

impl Driver for SysTickDriver {
    fn now(&self) -> u64 {
        critical_section::with(|cs| self.clock.borrow_ref(cs).now())
    }

    unsafe fn allocate_alarm(&self) -> Option<AlarmHandle> {
        if self.allocated.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(AlarmHandle::new(0))
    }

    fn set_alarm_callback(&self, _alarm: AlarmHandle, callback: fn(*mut ()), ctx: *mut ()) {
        critical_section::with(|cs| {
            self.callback.borrow(cs).set(Some((callback, ctx as usize)));
        });
    }

    fn set_alarm(&self, _alarm: AlarmHandle, timestamp: u64) -> bool {
        critical_section::with(|cs| self.clock.borrow_ref_mut(cs).arm(timestamp))
    }
}

embassy_time_driver::time_driver_impl!(static DRIVER: SysTickDriver = SysTickDriver::new());

/// Called from the SysTick handler
pub fn on_tick() {
    DRIVER.tick();
}

// Critical section implementation for single-core RISC-V
critical_section::set_impl!(RiscvCriticalSection);

struct RiscvCriticalSection;

unsafe impl critical_section::Impl for RiscvCriticalSection {
    unsafe fn acquire() -> u8 {
        let mut mstatus: usize;
        core::arch::asm!("csrrci {}, mstatus, 8", out(reg) mstatus);
        (mstatus & 8) as u8
    }

    unsafe fn release(was_active: u8) {
        if was_active != 0 {
            core::arch::asm!("csrsi mstatus, 8");
        }
    }
}
