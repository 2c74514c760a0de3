use avr_device::atmega128a::WDT;

const WDCE: u8 = 1 << 4;
const WDE: u8 = 1 << 3;

/// Watchdog timeout, WDP2:0 prescaler bits.
#[derive(Clone, Copy)]
#[repr(u8)]
pub enum WatchdogTimeout {
    Ms16 = 0,
    Ms32 = 1,
    Ms65 = 2,
    Ms130 = 3,
    Ms260 = 4,
    Ms520 = 5,
    Ms1000 = 6,
    Ms2100 = 7,
}

/// Resets the MCU when the main loop stops feeding it.
pub struct Watchdog {
    _private: (),
}

impl Watchdog {
    /// Arm the watchdog in system reset mode.
    pub fn enable(timeout: WatchdogTimeout) -> Self {
        avr_device::interrupt::free(|_| unsafe {
            let p = WDT::ptr();
            avr_device::asm::wdr();
            // timed sequence, second write within four cycles
            (*p).wdtcr.write(|w| w.bits(WDCE | WDE));
            (*p).wdtcr.write(|w| w.bits(WDE | timeout as u8));
        });
        Self { _private: () }
    }

    #[inline]
    pub fn feed(&mut self) {
        avr_device::asm::wdr();
    }
}
