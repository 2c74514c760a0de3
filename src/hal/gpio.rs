use avr_device::atmega128a::{PORTA, PORTC};
use core::convert::Infallible;
use core::marker::PhantomData;
use embedded_hal::digital::v2::{InputPin, OutputPin};

pub trait PinMode {}
pub struct Input;
pub struct Output;
impl PinMode for Input {}
impl PinMode for Output {}

#[derive(Debug)]
pub struct Pin<PORT, const PIN: u8, MODE> {
    _port: PhantomData<PORT>,
    _mode: PhantomData<MODE>,
}

impl<PORT, const P: u8> Pin<PORT, P, Input> {
    /// # Safety
    /// Each pin must be handed out once; see [`board::take`].
    const unsafe fn steal() -> Self {
        Pin {
            _port: PhantomData,
            _mode: PhantomData,
        }
    }
}

macro_rules! impl_port {
    ($PORT:ident, $port:ident, $ddr:ident, $pin:ident) => {
        impl<const P: u8, MODE: PinMode> Pin<$PORT, P, MODE> {
            pub fn into_output(self) -> Pin<$PORT, P, Output> {
                unsafe {
                    (*$PORT::ptr()).$ddr.modify(|r, w| w.bits(r.bits() | (1 << P)));
                }
                Pin {
                    _port: PhantomData,
                    _mode: PhantomData,
                }
            }

            /// Input with the internal pull-up enabled.
            pub fn into_pull_up_input(self) -> Pin<$PORT, P, Input> {
                unsafe {
                    (*$PORT::ptr()).$ddr.modify(|r, w| w.bits(r.bits() & !(1 << P)));
                    (*$PORT::ptr()).$port.modify(|r, w| w.bits(r.bits() | (1 << P)));
                }
                Pin {
                    _port: PhantomData,
                    _mode: PhantomData,
                }
            }
        }

        impl<const P: u8> OutputPin for Pin<$PORT, P, Output> {
            type Error = Infallible;

            #[inline]
            fn set_high(&mut self) -> Result<(), Infallible> {
                avr_device::interrupt::free(|_| unsafe {
                    (*$PORT::ptr()).$port.modify(|r, w| w.bits(r.bits() | (1 << P)));
                });
                Ok(())
            }

            #[inline]
            fn set_low(&mut self) -> Result<(), Infallible> {
                avr_device::interrupt::free(|_| unsafe {
                    (*$PORT::ptr()).$port.modify(|r, w| w.bits(r.bits() & !(1 << P)));
                });
                Ok(())
            }
        }

        impl<const P: u8> InputPin for Pin<$PORT, P, Input> {
            type Error = Infallible;

            #[inline]
            fn is_high(&self) -> Result<bool, Infallible> {
                Ok(unsafe { (*$PORT::ptr()).$pin.read().bits() } & (1 << P) != 0)
            }

            #[inline]
            fn is_low(&self) -> Result<bool, Infallible> {
                self.is_high().map(|high| !high)
            }
        }
    };
}

impl_port!(PORTA, porta, ddra, pina);
impl_port!(PORTC, portc, ddrc, pinc);

/// Mirror box wiring: encoders on PORTA, picomotor driver on PORTC.
pub mod board {
    use super::*;
    use portable_atomic::{AtomicBool, Ordering};

    pub type EncA0 = Pin<PORTA, 0, Input>;
    pub type EncB0 = Pin<PORTA, 1, Input>;
    pub type EncA1 = Pin<PORTA, 2, Input>;
    pub type EncB1 = Pin<PORTA, 3, Input>;
    pub type EncA2 = Pin<PORTA, 4, Input>;
    pub type EncB2 = Pin<PORTA, 5, Input>;

    pub type Step0 = Pin<PORTC, 0, Output>;
    pub type Dir0 = Pin<PORTC, 1, Output>;
    pub type Step1 = Pin<PORTC, 2, Output>;
    pub type Dir1 = Pin<PORTC, 3, Output>;
    pub type Step2 = Pin<PORTC, 4, Output>;
    pub type Dir2 = Pin<PORTC, 5, Output>;

    pub type MotorPower = Pin<PORTC, 7, Output>;

    pub struct AxisPins<A, B, STEP, DIR> {
        pub enc_a: A,
        pub enc_b: B,
        pub step: STEP,
        pub dir: DIR,
    }

    pub struct Pins {
        pub p0: AxisPins<EncA0, EncB0, Step0, Dir0>,
        pub p1: AxisPins<EncA1, EncB1, Step1, Dir1>,
        pub p2: AxisPins<EncA2, EncB2, Step2, Dir2>,
        pub power: MotorPower,
    }

    static TAKEN: AtomicBool = AtomicBool::new(false);

    /// Configure and hand out the board pins, once.
    pub fn take() -> Option<Pins> {
        if TAKEN.swap(true, Ordering::AcqRel) {
            return None;
        }
        // SAFETY: guarded by TAKEN, every pin below is created exactly once
        unsafe {
            Some(Pins {
                p0: AxisPins {
                    enc_a: EncA0::steal().into_pull_up_input(),
                    enc_b: EncB0::steal().into_pull_up_input(),
                    step: Pin::<PORTC, 0, Input>::steal().into_output(),
                    dir: Pin::<PORTC, 1, Input>::steal().into_output(),
                },
                p1: AxisPins {
                    enc_a: EncA1::steal().into_pull_up_input(),
                    enc_b: EncB1::steal().into_pull_up_input(),
                    step: Pin::<PORTC, 2, Input>::steal().into_output(),
                    dir: Pin::<PORTC, 3, Input>::steal().into_output(),
                },
                p2: AxisPins {
                    enc_a: EncA2::steal().into_pull_up_input(),
                    enc_b: EncB2::steal().into_pull_up_input(),
                    step: Pin::<PORTC, 4, Input>::steal().into_output(),
                    dir: Pin::<PORTC, 5, Input>::steal().into_output(),
                },
                power: Pin::<PORTC, 7, Input>::steal().into_output(),
            })
        }
    }
}
