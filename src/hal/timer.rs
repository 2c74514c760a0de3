use avr_device::atmega128a::TC0;
use embedded_hal::blocking::delay::DelayMs;

use crate::config::{CPU_FREQ_HZ, TIMER0_PRESCALER};

#[derive(Clone, Copy)]
pub enum Prescaler {
    Stop = 0,
    Direct = 1,
    Div8 = 2,
    Div32 = 3,
    Div64 = 4,
    Div128 = 5,
    Div256 = 6,
    Div1024 = 7,
}

const PRESCALER_MASK: u8 = 0x07;
const TOIE0: u8 = 1 << 0;

/// Timer 0 in normal mode; its overflow interrupt is the scheduler tick
/// source.
pub struct TickTimer {
    _private: (),
}

impl TickTimer {
    pub fn new() -> Self {
        unsafe {
            let p = TC0::ptr();
            (*p).tccr0.write(|w| w.bits(0));
            (*p).tcnt0.write(|w| w.bits(0));
        }
        Self { _private: () }
    }

    /// Start counting with the prescaler the tick quantum is computed for.
    pub fn start(&mut self) {
        let prescaler = match TIMER0_PRESCALER {
            1 => Prescaler::Direct,
            8 => Prescaler::Div8,
            32 => Prescaler::Div32,
            64 => Prescaler::Div64,
            _ => Prescaler::Div8,
        };
        unsafe {
            let p = TC0::ptr();
            (*p).tccr0.modify(|r, w| {
                w.bits((r.bits() & !PRESCALER_MASK) | (prescaler as u8 & PRESCALER_MASK))
            });
            (*p).timsk.modify(|r, w| w.bits(r.bits() | TOIE0));
        }
    }

    pub fn stop(&mut self) {
        unsafe {
            let p = TC0::ptr();
            (*p).timsk.modify(|r, w| w.bits(r.bits() & !TOIE0));
            (*p).tccr0.modify(|r, w| w.bits(r.bits() & !PRESCALER_MASK));
        }
    }
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::new()
    }
}

// ~4 cycles per loop iteration
const LOOPS_PER_MS: u32 = CPU_FREQ_HZ / 4_000;

/// Busy-wait delay. Resets the watchdog so long moves do not trip it.
pub struct Delay {
    _private: (),
}

impl Delay {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for Delay {
    fn default() -> Self {
        Self::new()
    }
}

impl DelayMs<u16> for Delay {
    fn delay_ms(&mut self, ms: u16) {
        for _ in 0..ms {
            for _ in 0..LOOPS_PER_MS {
                avr_device::asm::nop();
            }
            avr_device::asm::wdr();
        }
    }
}
