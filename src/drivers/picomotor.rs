//! Picomotor driver channels
//!
//! Each axis has a two-line quadrature encoder and a step/direction pair
//! going to the picomotor driver. A tick is one step pulse.

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::digital::v2::{InputPin, OutputPin};

use crate::config::STEP_PULSE_MS;
use crate::positioning::{Axis, Direction, DriverError, EncoderState, Picomotor};

/// Pin-level access to one axis.
pub trait AxisDriver {
    /// 2-bit encoder code, see [`EncoderState`].
    fn read_state(&mut self) -> Result<u8, DriverError>;

    /// Select the direction and raise the step line.
    fn start_pulse(&mut self, direction: Direction) -> Result<(), DriverError>;

    fn end_pulse(&mut self) -> Result<(), DriverError>;
}

pub struct PicomotorChannel<A, B, STEP, DIR> {
    enc_a: A,
    enc_b: B,
    step: STEP,
    dir: DIR,
}

impl<A, B, STEP, DIR> PicomotorChannel<A, B, STEP, DIR>
where
    A: InputPin,
    B: InputPin,
    STEP: OutputPin,
    DIR: OutputPin,
{
    pub fn new(enc_a: A, enc_b: B, step: STEP, dir: DIR) -> Self {
        Self {
            enc_a,
            enc_b,
            step,
            dir,
        }
    }

    #[cfg(test)]
    fn release(self) -> (A, B, STEP, DIR) {
        (self.enc_a, self.enc_b, self.step, self.dir)
    }
}

impl<A, B, STEP, DIR> AxisDriver for PicomotorChannel<A, B, STEP, DIR>
where
    A: InputPin,
    B: InputPin,
    STEP: OutputPin,
    DIR: OutputPin,
{
    fn read_state(&mut self) -> Result<u8, DriverError> {
        let a = self.enc_a.is_high().map_err(|_| DriverError::Encoder)?;
        let b = self.enc_b.is_high().map_err(|_| DriverError::Encoder)?;
        Ok(EncoderState::from_levels(a, b).code())
    }

    fn start_pulse(&mut self, direction: Direction) -> Result<(), DriverError> {
        match direction {
            Direction::Up => self.dir.set_high(),
            Direction::Down => self.dir.set_low(),
        }
        .map_err(|_| DriverError::Actuator)?;
        self.step.set_high().map_err(|_| DriverError::Actuator)
    }

    fn end_pulse(&mut self) -> Result<(), DriverError> {
        self.step.set_low().map_err(|_| DriverError::Actuator)
    }
}

/// The three axes sharing one delay source.
pub struct PicomotorBank<X, Y, Z, D> {
    p0: X,
    p1: Y,
    p2: Z,
    delay: D,
}

impl<X, Y, Z, D> PicomotorBank<X, Y, Z, D>
where
    X: AxisDriver,
    Y: AxisDriver,
    Z: AxisDriver,
    D: DelayMs<u16>,
{
    pub fn new(p0: X, p1: Y, p2: Z, delay: D) -> Self {
        Self { p0, p1, p2, delay }
    }

    fn channel(&mut self, axis: Axis) -> &mut dyn AxisDriver {
        match axis {
            Axis::P0 => &mut self.p0,
            Axis::P1 => &mut self.p1,
            Axis::P2 => &mut self.p2,
        }
    }
}

impl<X, Y, Z, D> Picomotor for PicomotorBank<X, Y, Z, D>
where
    X: AxisDriver,
    Y: AxisDriver,
    Z: AxisDriver,
    D: DelayMs<u16>,
{
    fn read_encoder_state(&mut self, axis: Axis) -> Result<u8, DriverError> {
        self.channel(axis).read_state()
    }

    fn actuate_tick(&mut self, axis: Axis, direction: Direction) -> Result<(), DriverError> {
        self.channel(axis).start_pulse(direction)?;
        self.delay.delay_ms(STEP_PULSE_MS);
        self.channel(axis).end_pulse()
    }

    fn delay_ms(&mut self, ms: u16) {
        self.delay.delay_ms(ms);
    }
}
