//! Closed-loop picomotor position estimation
//!
//! Coarse motion counts encoder boundary crossings, fine motion is an
//! open-loop tick count taken from calibrated boundary tables.

pub mod calibration;
pub mod controller;
pub mod decompose;
pub mod encoder;
pub mod mover;

#[cfg(test)]
pub(crate) mod testing;

pub use calibration::{calibrate, TickStatistics};
pub use controller::set_location;
pub use decompose::{decompose, BoundaryTable, Decomposition};
pub use encoder::{decode, DecodeError, EncoderState, Step};
pub use mover::{move_intervals, MoveAborted, Moved};

use embedded_hal::digital::v2::OutputPin;

use crate::config::{AXIS_COUNT, DEFAULT_INTERVAL_SIZE_NM};
use crate::diagnostics::{FaultCode, FunctionCode};
use crate::registers::Registers;

/// One of the independently driven picomotors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    P0 = 0,
    P1 = 1,
    P2 = 2,
}

impl Axis {
    pub const ALL: [Axis; AXIS_COUNT] = [Axis::P0, Axis::P1, Axis::P2];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Axis::P0),
            1 => Some(Axis::P1),
            2 => Some(Axis::P2),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Down,
    Up,
}

impl Direction {
    /// Direction of a signed count, `None` for zero.
    pub fn of(count: i32) -> Option<Self> {
        match count {
            0 => None,
            c if c > 0 => Some(Direction::Up),
            _ => Some(Direction::Down),
        }
    }

    #[inline]
    pub fn sign(self) -> i32 {
        match self {
            Direction::Down => -1,
            Direction::Up => 1,
        }
    }
}

/// Failure reported by the picomotor driver layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    Encoder,
    Actuator,
    Power,
}

/// Hardware seam used by every positioning operation.
pub trait Picomotor {
    /// Raw 2-bit quadrature code of `axis`.
    fn read_encoder_state(&mut self, axis: Axis) -> Result<u8, DriverError>;

    /// Issue one actuation pulse.
    fn actuate_tick(&mut self, axis: Axis, direction: Direction) -> Result<(), DriverError>;

    fn delay_ms(&mut self, ms: u16);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PicomotorError {
    Decode(DecodeError),
    FineStepsTooSmall,
    FineStepsTooLarge,
    /// Reserved. A zero coarse count is accepted, see `decompose`.
    CoarseIntervalsZero,
    MaxTicksExceeded,
    WrongDirection,
    /// Decomposition produced no fine step.
    LocateCritical,
    Driver(DriverError),
    /// Calibration asked for zero intervals.
    ZeroIntervals,
    InvalidIntervalSize,
    InvalidBoundaryTable,
    /// Coarse interval count does not fit the signed 32-bit range.
    CoarseOutOfRange,
}

impl From<DecodeError> for PicomotorError {
    fn from(err: DecodeError) -> Self {
        PicomotorError::Decode(err)
    }
}

impl From<DriverError> for PicomotorError {
    fn from(err: DriverError) -> Self {
        PicomotorError::Driver(err)
    }
}

impl FaultCode for PicomotorError {
    fn code(&self) -> u8 {
        match self {
            PicomotorError::Decode(DecodeError::CurrentOutOfBounds) => 208,
            PicomotorError::Decode(DecodeError::PreviousOutOfBounds) => 209,
            PicomotorError::Decode(DecodeError::InvalidTransition) => 210,
            PicomotorError::Decode(DecodeError::Critical) => 211,
            PicomotorError::FineStepsTooSmall => 212,
            PicomotorError::FineStepsTooLarge => 213,
            PicomotorError::CoarseIntervalsZero => 214,
            PicomotorError::MaxTicksExceeded => 215,
            PicomotorError::WrongDirection => 216,
            PicomotorError::LocateCritical => 217,
            PicomotorError::Driver(DriverError::Encoder) => 220,
            PicomotorError::Driver(DriverError::Actuator) => 221,
            PicomotorError::Driver(DriverError::Power) => 222,
            PicomotorError::ZeroIntervals => 223,
            PicomotorError::InvalidIntervalSize => 224,
            PicomotorError::InvalidBoundaryTable => 225,
            PicomotorError::CoarseOutOfRange => 226,
        }
    }
}

/// Reset every axis to the factory interval size, set the tick bound and
/// switch the picomotor supply on.
pub fn init_estimation<P: OutputPin>(
    registers: &mut Registers,
    max_ticks: u32,
    power: &mut P,
) -> Result<(), PicomotorError> {
    registers.enter(FunctionCode::EstimationInit);

    for axis in Axis::ALL {
        let cal = registers.axis_mut(axis);
        cal.interval_size_nm = DEFAULT_INTERVAL_SIZE_NM;
        cal.max_ticks_per_interval = max_ticks;
    }

    power
        .set_high()
        .map_err(|_| PicomotorError::Driver(DriverError::Power))
}
